//! 请求准入控制
//!
//! 每个受保护入口一个 [`AdmissionGuard`] 实例，共享同一个存储，
//! key 按入口名加前缀，不同入口的记录互不干扰。

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    config::RateLimitSettings,
    domain::{
        rate_limit::{RateLimitDecision, RateLimitPolicy},
        wallet_error::WalletError,
    },
    infrastructure::{clock::Clock, rate_limit_store::RateLimitStore},
};

/// 受保护的入口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardSurface {
    Api,
    Auth,
    Proposal,
}

impl GuardSurface {
    pub const ALL: [GuardSurface; 3] = [GuardSurface::Api, GuardSurface::Auth, GuardSurface::Proposal];

    pub fn as_str(&self) -> &'static str {
        match self {
            GuardSurface::Api => "api",
            GuardSurface::Auth => "auth",
            GuardSurface::Proposal => "proposal",
        }
    }
}

impl fmt::Display for GuardSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuardSurface {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GuardSurface::ALL
            .into_iter()
            .find(|surface| surface.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| WalletError::NotRegistered(format!("admission surface {}", s)))
    }
}

#[derive(Clone)]
pub struct AdmissionGuard {
    surface: GuardSurface,
    policy: RateLimitPolicy,
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
}

impl AdmissionGuard {
    pub fn new(
        surface: GuardSurface,
        policy: RateLimitPolicy,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            surface,
            policy,
            store,
            clock,
        }
    }

    pub fn surface(&self) -> GuardSurface {
        self.surface
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    fn scoped_key(&self, key: &str) -> String {
        format!("rate_limit:{}:{}", self.surface, key)
    }

    /// 计数并判定，被拒绝的请求不计数
    pub async fn check(&self, key: &str) -> Result<RateLimitDecision, WalletError> {
        let now = self.clock.now_ms();
        let decision = self
            .store
            .check_and_count(&self.scoped_key(key), now, &self.policy)
            .await?;

        if !decision.allowed {
            tracing::warn!(
                surface = %self.surface,
                key,
                reset_time = decision.reset_time,
                "admission rejected"
            );
        }
        Ok(decision)
    }

    /// 与 [`check`](Self::check) 相同，拒绝时返回 `RateLimited`
    pub async fn admit(&self, key: &str) -> Result<RateLimitDecision, WalletError> {
        let decision = self.check(key).await?;
        if !decision.allowed {
            return Err(WalletError::RateLimited {
                reset_time: decision.reset_time,
            });
        }
        Ok(decision)
    }

    /// 删除记录，下次 check 开启新窗口
    pub async fn reset(&self, key: &str) -> Result<(), WalletError> {
        tracing::debug!(surface = %self.surface, key, "admission window reset");
        self.store.delete(&self.scoped_key(key)).await
    }
}

/// 各入口的命名实例
#[derive(Clone)]
pub struct AdmissionGuards {
    pub api: AdmissionGuard,
    pub auth: AdmissionGuard,
    pub proposal: AdmissionGuard,
}

impl AdmissionGuards {
    pub fn from_settings(
        settings: &RateLimitSettings,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let guard = |surface: GuardSurface, policy: RateLimitPolicy| {
            AdmissionGuard::new(surface, policy, store.clone(), clock.clone())
        };
        Self {
            api: guard(GuardSurface::Api, settings.api),
            auth: guard(GuardSurface::Auth, settings.auth),
            proposal: guard(GuardSurface::Proposal, settings.proposal),
        }
    }

    pub fn get(&self, surface: GuardSurface) -> &AdmissionGuard {
        match surface {
            GuardSurface::Api => &self.api,
            GuardSurface::Auth => &self.auth,
            GuardSurface::Proposal => &self.proposal,
        }
    }

    pub fn by_name(&self, name: &str) -> Option<&AdmissionGuard> {
        name.parse().ok().map(|surface| self.get(surface))
    }
}
