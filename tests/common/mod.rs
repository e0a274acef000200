//! 测试辅助模块
//! 提供扩展桥接替身、测试配置与应用状态

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use harmonia::{
    app_state::AppState,
    config::{Config, LoggingConfig, RateLimitSettings, RedisConfig, ServerConfig, WalletConfig},
    domain::rate_limit::RateLimitPolicy,
    infrastructure::{
        clock::ManualClock,
        extension::{BridgeError, ExtensionBridge},
        rate_limit_store::MemoryRateLimitStore,
    },
};
use tokio::sync::Notify;

pub const ALICE: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";
pub const BOB: &str = "GBRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX2H";

/// 测试Redis URL
pub fn test_redis_url() -> String {
    std::env::var("TEST_REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into())
}

/// 可编排的扩展替身
pub struct FakeExtension {
    pub injected: AtomicBool,
    pub public_key: Mutex<Result<String, BridgeError>>,
    pub signature: Mutex<Result<String, BridgeError>>,
    /// 设置后 request_public_key 会等待通知
    pub gate: Option<Arc<Notify>>,
    pub connect_calls: AtomicUsize,
    pub sign_calls: AtomicUsize,
    pub forget_calls: AtomicUsize,
}

impl FakeExtension {
    pub fn installed(public_key: &str) -> Self {
        Self {
            injected: AtomicBool::new(true),
            public_key: Mutex::new(Ok(public_key.to_string())),
            signature: Mutex::new(Ok("AAAAAgAAAAA=".to_string())),
            gate: None,
            connect_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
            forget_calls: AtomicUsize::new(0),
        }
    }

    pub fn missing() -> Self {
        let ext = Self::installed(ALICE);
        ext.injected.store(false, Ordering::SeqCst);
        ext
    }

    pub fn gated(public_key: &str, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::installed(public_key)
        }
    }

    pub fn fail_connect(&self, err: BridgeError) {
        *self.public_key.lock().unwrap() = Err(err);
    }

    pub fn fail_sign(&self, err: BridgeError) {
        *self.signature.lock().unwrap() = Err(err);
    }
}

#[async_trait]
impl ExtensionBridge for FakeExtension {
    fn is_injected(&self) -> Result<bool, BridgeError> {
        Ok(self.injected.load(Ordering::SeqCst))
    }

    async fn request_public_key(&self) -> Result<String, BridgeError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.public_key.lock().unwrap().clone()
    }

    async fn sign_transaction(
        &self,
        _xdr: &str,
        _network_passphrase: &str,
        _address: &str,
    ) -> Result<String, BridgeError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.signature.lock().unwrap().clone()
    }

    async fn forget(&self) -> Result<(), BridgeError> {
        self.forget_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 与环境变量无关的测试配置
pub fn test_config(rate_limit: RateLimitSettings) -> Config {
    Config {
        server: ServerConfig {
            bind_addr: "127.0.0.1:0".into(),
        },
        redis: RedisConfig { url: None },
        logging: LoggingConfig {
            level: "debug".into(),
            format: "text".into(),
        },
        wallet: WalletConfig {
            network: "testnet".into(),
            connect_timeout_ms: 1_000,
            sign_timeout_ms: 1_000,
        },
        rate_limit,
    }
}

pub fn uniform_limits(window_ms: u64, max_requests: u32) -> RateLimitSettings {
    let policy = RateLimitPolicy::new(window_ms, max_requests);
    RateLimitSettings {
        api: policy,
        auth: policy,
        proposal: policy,
    }
}

/// 创建测试应用状态（内存存储 + 手动时钟）
pub fn create_test_app_state(rate_limit: RateLimitSettings) -> (Arc<AppState>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let state = AppState::with_store(
        Arc::new(test_config(rate_limit)),
        Arc::new(MemoryRateLimitStore::new()),
        clock.clone(),
    );
    (Arc::new(state), clock)
}
