//! 钱包 provider 能力契约
//!
//! 每种钱包扩展都是同一能力集合的一个变体：探测、连接、签名（以及可选的断开）。
//! 具体实现见 `infrastructure::wallet_adapters`，测试中可直接实现该 trait。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    envelope::{SignedEnvelope, TransactionEnvelope},
    identity::Identity,
    wallet_error::WalletError,
};

/// provider 描述信息
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: String,
    pub display_name: String,
}

impl ProviderDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// 已知的钱包扩展种类，顺序即默认探测优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    Freighter,
    XBull,
    Albedo,
    Lobstr,
    Rabet,
    Hana,
    HotWallet,
}

impl WalletKind {
    pub const ALL: [WalletKind; 7] = [
        WalletKind::Freighter,
        WalletKind::XBull,
        WalletKind::Albedo,
        WalletKind::Lobstr,
        WalletKind::Rabet,
        WalletKind::Hana,
        WalletKind::HotWallet,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            WalletKind::Freighter => "freighter",
            WalletKind::XBull => "xbull",
            WalletKind::Albedo => "albedo",
            WalletKind::Lobstr => "lobstr",
            WalletKind::Rabet => "rabet",
            WalletKind::Hana => "hana",
            WalletKind::HotWallet => "hot",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            WalletKind::Freighter => "Freighter",
            WalletKind::XBull => "xBull",
            WalletKind::Albedo => "Albedo",
            WalletKind::Lobstr => "Lobstr",
            WalletKind::Rabet => "Rabet",
            WalletKind::Hana => "Hana",
            WalletKind::HotWallet => "Hot Wallet",
        }
    }

    /// 按 id 查找（大小写不敏感）
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim().to_lowercase();
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor::new(self.id(), self.display_name())
    }
}

/// provider 能力契约
///
/// - `detect` 同步且无副作用；返回 `Err` 时注册表视为不可用
/// - `connect` 返回扩展报告的原始公钥，由会话负责格式校验
/// - `sign` 只允许返回 `UserRejected` 或 `ProviderError`
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;

    fn id(&self) -> &str {
        &self.descriptor().id
    }

    fn detect(&self) -> Result<bool, WalletError>;

    async fn connect(&self) -> Result<String, WalletError>;

    async fn sign(
        &self,
        envelope: &TransactionEnvelope,
        identity: &Identity,
    ) -> Result<SignedEnvelope, WalletError>;

    /// 让扩展忘记当前连接，尽力而为
    async fn disconnect(&self) -> Result<(), WalletError> {
        Ok(())
    }
}
