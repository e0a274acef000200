//! 钱包扩展桥接层
//!
//! 浏览器扩展是异步注入的不透明对象，各家 API 的方法名与错误结构都不一样。
//! [`ExtensionBridge`] 只描述"原始"能力，错误以 [`BridgeError`] 原样带出，
//! 由 `wallet_adapters` 按钱包种类归一化。

use std::fmt;

use async_trait::async_trait;

/// 扩展返回的原始错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeError {
    /// 扩展自带的错误码（部分扩展没有）
    pub code: Option<i64>,
    pub message: String,
}

impl BridgeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for BridgeError {}

/// 注入扩展对象的原始接口
///
/// 调用无法被强制取消：超时只意味着调用方不再等待。
#[async_trait]
pub trait ExtensionBridge: Send + Sync {
    /// 扩展对象当前是否已注入（同步、无副作用）
    fn is_injected(&self) -> Result<bool, BridgeError>;

    /// 请求访问并返回账户公钥
    async fn request_public_key(&self) -> Result<String, BridgeError>;

    /// 请求签名，返回签名后的 base64 XDR
    async fn sign_transaction(
        &self,
        xdr: &str,
        network_passphrase: &str,
        address: &str,
    ) -> Result<String, BridgeError>;

    /// 让扩展忘记当前站点的授权
    async fn forget(&self) -> Result<(), BridgeError> {
        Ok(())
    }
}
