use std::sync::Arc;

use anyhow::Context;

use crate::{
    config::Config,
    infrastructure::{
        cache::RedisCtx,
        clock::{Clock, SystemClock},
        rate_limit_store::{MemoryRateLimitStore, RateLimitStore, RedisRateLimitStore},
    },
    service::admission_guard::AdmissionGuards,
};

/// 应用状态
/// 包含所有共享资源
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RateLimitStore>,
    pub clock: Arc<dyn Clock>,
    pub guards: AdmissionGuards,
}

impl AppState {
    /// 创建新的应用状态
    ///
    /// 配置了 Redis 时启动前先 PING，失败直接返回错误。
    pub async fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let store: Arc<dyn RateLimitStore> = match &config.redis.url {
            Some(url) => {
                let redis = RedisCtx::new(url).context("Failed to create Redis client")?;
                redis.ping().await.context("Redis is not reachable")?;
                tracing::info!("rate limit store: redis");
                Arc::new(RedisRateLimitStore::new(redis))
            }
            None => {
                tracing::info!("rate limit store: memory (REDIS_URL not set)");
                Arc::new(MemoryRateLimitStore::new())
            }
        };

        Ok(Self::with_store(config, store, Arc::new(SystemClock)))
    }

    /// 使用指定存储与时钟（测试用）
    pub fn with_store(
        config: Arc<Config>,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let guards = AdmissionGuards::from_settings(&config.rate_limit, store.clone(), clock.clone());
        Self {
            config,
            store,
            clock,
            guards,
        }
    }
}
