//! 钱包会话状态机
//!
//! 一个 [`WalletSession`] 对应一个用户上下文，只能通过 `connect` / `disconnect`
//! 改变状态。状态锁从不跨越 await：握手在独立任务中执行，
//! 所有并发的 connect() 调用共享同一个 in-flight 结果。

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;

use crate::{
    config::WalletConfig,
    domain::{
        envelope::WalletNetwork,
        identity::Identity,
        provider::WalletProvider,
        session::{SessionSnapshot, SessionStatus},
        wallet_error::{ErrorKind, WalletError},
    },
    service::provider_registry::ProviderRegistry,
};

type ConnectFuture = Shared<BoxFuture<'static, Result<Identity, WalletError>>>;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// 握手等待上限，超时后放弃等待（扩展本身无法取消）
    pub connect_timeout: Duration,
    /// 会话绑定的网络，签名时校验信封口令
    pub network: WalletNetwork,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(30_000),
            network: WalletNetwork::Testnet,
        }
    }
}

impl From<&WalletConfig> for SessionConfig {
    fn from(config: &WalletConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            network: WalletNetwork::parse_lenient(&config.network),
        }
    }
}

enum Phase {
    Disconnected,
    Connecting {
        attempt: u64,
        provider_id: String,
        inflight: ConnectFuture,
    },
    Connected {
        provider: Arc<dyn WalletProvider>,
        identity: Identity,
    },
    Disconnecting,
    Error,
}

struct SessionState {
    phase: Phase,
    last_error: Option<ErrorKind>,
    next_attempt: u64,
}

impl SessionState {
    fn status(&self) -> SessionStatus {
        match self.phase {
            Phase::Disconnected => SessionStatus::Disconnected,
            Phase::Connecting { .. } => SessionStatus::Connecting,
            Phase::Connected { .. } => SessionStatus::Connected,
            Phase::Disconnecting => SessionStatus::Disconnecting,
            Phase::Error => SessionStatus::Error,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        let (provider_id, identity) = match &self.phase {
            Phase::Connected { provider, identity } => {
                (Some(provider.id().to_string()), Some(identity.clone()))
            }
            _ => (None, None),
        };
        SessionSnapshot {
            status: self.status(),
            provider_id,
            identity,
            last_error: self.last_error,
        }
    }
}

struct Inner {
    registry: Arc<ProviderRegistry>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: &SessionState) {
        self.updates.send_replace(state.snapshot());
    }

    /// 握手任务结束时回写状态；已被取代的尝试不会改变会话
    fn finish_attempt(
        &self,
        attempt: u64,
        provider: Arc<dyn WalletProvider>,
        result: Result<Identity, WalletError>,
    ) -> Result<Identity, WalletError> {
        let mut state = self.lock();
        let current = matches!(
            &state.phase,
            Phase::Connecting { attempt: active, .. } if *active == attempt
        );
        if !current {
            tracing::debug!(attempt, provider_id = provider.id(), "discarding stale connect result");
            return result;
        }

        match &result {
            Ok(identity) => {
                tracing::info!(
                    provider_id = provider.id(),
                    address = %identity.short(),
                    "wallet connected"
                );
                state.phase = Phase::Connected {
                    provider,
                    identity: identity.clone(),
                };
                state.last_error = None;
            }
            Err(e) => {
                tracing::warn!(
                    provider_id = provider.id(),
                    error = %e,
                    retryable = e.is_retryable(),
                    "wallet connect failed"
                );
                state.phase = Phase::Error;
                state.last_error = Some(e.kind());
            }
        }
        self.publish(&state);
        result
    }
}

/// 单个用户上下文的钱包会话句柄，克隆后共享同一状态
#[derive(Clone)]
pub struct WalletSession {
    inner: Arc<Inner>,
}

impl WalletSession {
    pub fn new(registry: Arc<ProviderRegistry>, config: SessionConfig) -> Self {
        let (updates, _) = watch::channel(SessionSnapshot::disconnected());
        Self {
            inner: Arc::new(Inner {
                registry,
                config,
                state: Mutex::new(SessionState {
                    phase: Phase::Disconnected,
                    last_error: None,
                    next_attempt: 0,
                }),
                updates,
            }),
        }
    }

    /// 连接指定 provider
    ///
    /// 已在 `Connecting` 时加入进行中的握手并得到同一结果。
    pub async fn connect(&self, provider_id: &str) -> Result<Identity, WalletError> {
        let inflight = {
            let mut state = self.inner.lock();
            match &state.phase {
                Phase::Connected { provider, identity } => {
                    if provider.id() == provider_id {
                        return Ok(identity.clone());
                    }
                    return Err(WalletError::InvalidTransition {
                        from: SessionStatus::Connected,
                        operation: "connect",
                    });
                }
                Phase::Disconnecting => {
                    return Err(WalletError::InvalidTransition {
                        from: SessionStatus::Disconnecting,
                        operation: "connect",
                    });
                }
                Phase::Connecting {
                    provider_id: active,
                    inflight,
                    ..
                } => {
                    if active != provider_id {
                        tracing::warn!(
                            requested = provider_id,
                            active = %active,
                            "connect already in flight, joining active attempt"
                        );
                    }
                    inflight.clone()
                }
                Phase::Disconnected | Phase::Error => {
                    let provider = match self.inner.registry.get_provider(provider_id) {
                        Ok(provider) => provider,
                        Err(e) => {
                            state.last_error = Some(e.kind());
                            self.inner.publish(&state);
                            return Err(e);
                        }
                    };
                    self.start_attempt(&mut state, provider)
                }
            }
        };

        inflight.await
    }

    fn start_attempt(
        &self,
        state: &mut SessionState,
        provider: Arc<dyn WalletProvider>,
    ) -> ConnectFuture {
        state.next_attempt += 1;
        let attempt = state.next_attempt;
        let timeout = self.inner.config.connect_timeout;
        let inner = self.inner.clone();
        let task_provider = provider.clone();

        let handle = tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, task_provider.connect()).await {
                Ok(Ok(raw)) => Identity::parse(raw),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(WalletError::timed_out(timeout)),
            };
            inner.finish_attempt(attempt, task_provider, result)
        });

        let inflight = async move {
            handle.await.unwrap_or_else(|e| {
                Err(WalletError::ProviderError(format!("connect task aborted: {}", e)))
            })
        }
        .boxed()
        .shared();

        tracing::debug!(attempt, provider_id = provider.id(), "wallet connecting");
        state.phase = Phase::Connecting {
            attempt,
            provider_id: provider.id().to_string(),
            inflight: inflight.clone(),
        };
        state.last_error = None;
        self.inner.publish(state);
        inflight
    }

    /// 断开连接
    ///
    /// 已断开或正在断开时直接成功；扩展侧的 forget 失败只记录日志。
    pub async fn disconnect(&self) -> Result<(), WalletError> {
        let provider = {
            let mut state = self.inner.lock();
            match &state.phase {
                Phase::Disconnected | Phase::Disconnecting => return Ok(()),
                Phase::Connecting { .. } => {
                    return Err(WalletError::InvalidTransition {
                        from: SessionStatus::Connecting,
                        operation: "disconnect",
                    });
                }
                Phase::Error => {
                    state.phase = Phase::Disconnected;
                    state.last_error = None;
                    self.inner.publish(&state);
                    return Ok(());
                }
                Phase::Connected { provider, .. } => {
                    let provider = provider.clone();
                    state.phase = Phase::Disconnecting;
                    self.inner.publish(&state);
                    provider
                }
            }
        };

        match tokio::time::timeout(self.inner.config.connect_timeout, provider.disconnect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(provider_id = provider.id(), error = %e, "provider disconnect failed")
            }
            Err(_) => tracing::warn!(provider_id = provider.id(), "provider disconnect timed out"),
        }

        let mut state = self.inner.lock();
        if matches!(state.phase, Phase::Disconnecting) {
            state.phase = Phase::Disconnected;
            state.last_error = None;
            self.inner.publish(&state);
        }
        tracing::info!(provider_id = provider.id(), "wallet disconnected");
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.lock().status()
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.updates.subscribe()
    }

    pub fn network(&self) -> WalletNetwork {
        self.inner.config.network
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.inner.registry
    }

    /// 当前绑定的 provider 与身份（仅 Connected）
    pub(crate) fn bound_provider(&self) -> Option<(Arc<dyn WalletProvider>, Identity)> {
        match &self.inner.lock().phase {
            Phase::Connected { provider, identity } => Some((provider.clone(), identity.clone())),
            _ => None,
        }
    }
}
