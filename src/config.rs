//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{envelope::WalletNetwork, rate_limit::RateLimitPolicy};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

/// Redis配置，未配置时使用进程内存储
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

/// 钱包会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    pub network: String,
    pub connect_timeout_ms: u64,
    pub sign_timeout_ms: u64,
}

/// 各入口的准入策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub api: RateLimitPolicy,
    pub auth: RateLimitPolicy,
    pub proposal: RateLimitPolicy,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8090".into()),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: std::env::var("WALLET_NETWORK").unwrap_or_else(|_| "testnet".into()),
            connect_timeout_ms: env_parse("WALLET_CONNECT_TIMEOUT_MS").unwrap_or(30_000),
            sign_timeout_ms: env_parse("WALLET_SIGN_TIMEOUT_MS").unwrap_or(120_000),
        }
    }
}

impl WalletConfig {
    pub fn network(&self) -> WalletNetwork {
        WalletNetwork::parse_lenient(&self.network)
    }
}

/// `RATE_LIMIT_<SURFACE>_WINDOW_MS` / `RATE_LIMIT_<SURFACE>_MAX` 覆盖默认值
fn policy_from_env(surface: &str, default: RateLimitPolicy) -> RateLimitPolicy {
    RateLimitPolicy::new(
        env_parse(&format!("RATE_LIMIT_{}_WINDOW_MS", surface)).unwrap_or(default.window_ms),
        env_parse(&format!("RATE_LIMIT_{}_MAX", surface)).unwrap_or(default.max_requests),
    )
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            api: policy_from_env("API", RateLimitPolicy::general_api()),
            auth: policy_from_env("AUTH", RateLimitPolicy::authentication()),
            proposal: policy_from_env("PROPOSAL", RateLimitPolicy::proposal_submission()),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig::default(),
            redis: RedisConfig::default(),
            logging: LoggingConfig::default(),
            wallet: WalletConfig::default(),
            rate_limit: RateLimitSettings::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.redis.url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                anyhow::bail!("REDIS_URL must start with redis:// or rediss://");
            }
        }

        if WalletNetwork::parse(&self.wallet.network).is_none() {
            let known: Vec<&str> = WalletNetwork::ALL.iter().map(|n| n.as_str()).collect();
            anyhow::bail!(
                "WALLET_NETWORK '{}' is not one of: {:?}",
                self.wallet.network,
                known
            );
        }

        if self.wallet.connect_timeout_ms == 0 || self.wallet.sign_timeout_ms == 0 {
            anyhow::bail!("wallet timeouts must be greater than zero");
        }

        let policies = [
            ("api", &self.rate_limit.api),
            ("auth", &self.rate_limit.auth),
            ("proposal", &self.rate_limit.proposal),
        ];
        for (name, policy) in policies {
            if policy.window_ms == 0 {
                anyhow::bail!("rate limit window for '{}' must be greater than zero", name);
            }
        }

        // 验证日志级别
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        // 验证日志格式
        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}
