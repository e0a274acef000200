//! 钱包核心错误分类
//!
//! 所有扩展相关的故障在适配器边界被归一化为 [`WalletError`]，
//! 会话与签名逻辑只面对这一套分类，不接触原始的扩展错误结构。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::session::SessionStatus;

/// 钱包核心错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// 钱包扩展未安装或未注入
    #[error("wallet extension is not installed")]
    NotInstalled,

    /// 注册表中不存在该 provider
    #[error("wallet provider not registered: {0}")]
    NotRegistered(String),

    /// provider 返回的公钥未通过地址格式校验
    #[error("invalid wallet identity: {0}")]
    InvalidIdentity(String),

    /// 用户在扩展中拒绝了请求
    #[error("request rejected by user")]
    UserRejected,

    #[error("wallet request timed out: {0}")]
    Timeout(String),

    /// 其他扩展故障，携带原始消息
    #[error("wallet provider error: {0}")]
    ProviderError(String),

    #[error("no wallet connected")]
    NotConnected,

    /// 准入控制拒绝，`reset_time` 为窗口重置时间（毫秒时间戳）
    #[error("rate limit exceeded, retry after {reset_time}")]
    RateLimited { reset_time: i64 },

    /// 当前状态不允许该操作
    #[error("cannot {operation} while session is {from}")]
    InvalidTransition {
        from: SessionStatus,
        operation: &'static str,
    },

    /// 调用方违反契约（信封为空、非 base64、网络不匹配）
    #[error("invalid transaction envelope: {0}")]
    InvalidEnvelope(String),

    /// 速率限制存储故障
    #[error("rate limit store error: {0}")]
    Store(String),
}

/// 错误种类，记录在会话的 `last_error` 中
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotInstalled,
    NotRegistered,
    InvalidIdentity,
    UserRejected,
    Timeout,
    ProviderError,
    NotConnected,
    RateLimited,
    InvalidTransition,
    InvalidEnvelope,
    Store,
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::NotInstalled => ErrorKind::NotInstalled,
            WalletError::NotRegistered(_) => ErrorKind::NotRegistered,
            WalletError::InvalidIdentity(_) => ErrorKind::InvalidIdentity,
            WalletError::UserRejected => ErrorKind::UserRejected,
            WalletError::Timeout(_) => ErrorKind::Timeout,
            WalletError::ProviderError(_) => ErrorKind::ProviderError,
            WalletError::NotConnected => ErrorKind::NotConnected,
            WalletError::RateLimited { .. } => ErrorKind::RateLimited,
            WalletError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            WalletError::InvalidEnvelope(_) => ErrorKind::InvalidEnvelope,
            WalletError::Store(_) => ErrorKind::Store,
        }
    }

    /// 客户端等待超时
    pub fn timed_out(after: Duration) -> Self {
        WalletError::Timeout(format!("no response within {}ms", after.as_millis()))
    }

    /// 会话可以通过再次 connect() 恢复的错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::UserRejected
                | WalletError::Timeout(_)
                | WalletError::ProviderError(_)
                | WalletError::RateLimited { .. }
        )
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotInstalled => "not_installed",
            ErrorKind::NotRegistered => "not_registered",
            ErrorKind::InvalidIdentity => "invalid_identity",
            ErrorKind::UserRejected => "user_rejected",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ProviderError => "provider_error",
            ErrorKind::NotConnected => "not_connected",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::InvalidEnvelope => "invalid_envelope",
            ErrorKind::Store => "store",
        }
    }
}
