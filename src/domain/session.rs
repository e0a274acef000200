//! 钱包会话状态模型
//!
//! ```text
//! Disconnected -> Connecting      connect()
//! Error        -> Connecting      connect()（可恢复）
//! Connecting   -> Connected       握手成功且地址合法
//! Connecting   -> Error           拒绝 / 未安装 / 超时 / 地址非法
//! Connected    -> Disconnecting   disconnect()
//! Disconnecting-> Disconnected
//! Error        -> Disconnected    disconnect()
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{identity::Identity, wallet_error::ErrorKind};

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Disconnecting => "disconnecting",
            SessionStatus::Error => "error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 会话只读快照，供 UI 渲染
///
/// `identity` 与 `provider_id` 仅在 `Connected` 时存在。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub provider_id: Option<String>,
    pub identity: Option<Identity>,
    pub last_error: Option<ErrorKind>,
}

impl SessionSnapshot {
    pub fn disconnected() -> Self {
        Self {
            status: SessionStatus::Disconnected,
            provider_id: None,
            identity: None,
            last_error: None,
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::disconnected()
    }
}
