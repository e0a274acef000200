//! 交易信封与网络定义
//!
//! 信封由上游（提案 / 国库操作）构建完毕后交给签名器，这里不构建也不解析交易，
//! 只做最基本的契约检查：XDR 非空且为合法 base64，网络口令与会话一致。

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::domain::wallet_error::WalletError;

/// Stellar 网络
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletNetwork {
    Public,
    #[default]
    Testnet,
    Futurenet,
    Sandbox,
    Standalone,
}

impl WalletNetwork {
    pub const ALL: [WalletNetwork; 5] = [
        WalletNetwork::Public,
        WalletNetwork::Testnet,
        WalletNetwork::Futurenet,
        WalletNetwork::Sandbox,
        WalletNetwork::Standalone,
    ];

    /// 网络口令（签名时参与哈希）
    pub fn passphrase(&self) -> &'static str {
        match self {
            WalletNetwork::Public => "Public Global Stellar Network ; September 2015",
            WalletNetwork::Testnet => "Test SDF Network ; September 2015",
            WalletNetwork::Futurenet => "Test SDF Future Network ; October 2022",
            WalletNetwork::Sandbox => "Local Sandbox Stellar Network ; September 2022",
            WalletNetwork::Standalone => "Standalone Network ; February 2017",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            WalletNetwork::Public => "Mainnet",
            WalletNetwork::Testnet => "Testnet",
            WalletNetwork::Futurenet => "Futurenet",
            WalletNetwork::Sandbox => "Sandbox",
            WalletNetwork::Standalone => "Standalone",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WalletNetwork::Public => "mainnet",
            WalletNetwork::Testnet => "testnet",
            WalletNetwork::Futurenet => "futurenet",
            WalletNetwork::Sandbox => "sandbox",
            WalletNetwork::Standalone => "standalone",
        }
    }

    /// 宽松解析：未知名称回退到 Testnet
    /// 严格解析，未知名称返回 `None`
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "mainnet" | "public" => Some(WalletNetwork::Public),
            "testnet" => Some(WalletNetwork::Testnet),
            "futurenet" => Some(WalletNetwork::Futurenet),
            "sandbox" => Some(WalletNetwork::Sandbox),
            "standalone" => Some(WalletNetwork::Standalone),
            _ => None,
        }
    }

    pub fn parse_lenient(name: &str) -> Self {
        Self::parse(name).unwrap_or(WalletNetwork::Testnet)
    }

    pub fn horizon_url(&self) -> &'static str {
        match self {
            WalletNetwork::Public => "https://horizon.stellar.org",
            WalletNetwork::Testnet => "https://horizon-testnet.stellar.org",
            WalletNetwork::Futurenet => "https://horizon-futurenet.stellar.org",
            WalletNetwork::Sandbox => "https://horizon-sandbox.stellar.org",
            WalletNetwork::Standalone => "http://localhost:8000",
        }
    }

    pub fn soroban_rpc_url(&self) -> &'static str {
        match self {
            WalletNetwork::Public => "https://soroban-mainnet.stellar.org",
            WalletNetwork::Testnet => "https://soroban-testnet.stellar.org",
            WalletNetwork::Futurenet => "https://soroban-futurenet.stellar.org",
            WalletNetwork::Sandbox => "https://soroban-sandbox.stellar.org",
            WalletNetwork::Standalone => "http://localhost:8000",
        }
    }

    pub fn is_mainnet(&self) -> bool {
        *self == WalletNetwork::Public
    }

    /// 区块浏览器中的账户页面
    pub fn account_explorer_url(&self, address: &str) -> String {
        format!("{}/account/{}", self.explorer_base(), address)
    }

    pub fn transaction_explorer_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_base(), tx_hash)
    }

    fn explorer_base(&self) -> &'static str {
        if self.is_mainnet() {
            "https://stellar.expert/explorer/public"
        } else {
            "https://stellar.expert/explorer/testnet"
        }
    }
}

impl fmt::Display for WalletNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 待签名的交易信封（base64 XDR）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub xdr: String,
    pub network_passphrase: String,
}

impl TransactionEnvelope {
    pub fn new(xdr: impl Into<String>, network: WalletNetwork) -> Self {
        Self {
            xdr: xdr.into(),
            network_passphrase: network.passphrase().to_string(),
        }
    }

    /// 契约检查：XDR 非空、可解码，且口令与目标网络一致
    pub fn validate_for(&self, network: WalletNetwork) -> Result<(), WalletError> {
        let xdr = self.xdr.trim();
        if xdr.is_empty() {
            return Err(WalletError::InvalidEnvelope("empty XDR".into()));
        }
        if STANDARD.decode(xdr).is_err() {
            return Err(WalletError::InvalidEnvelope("XDR is not valid base64".into()));
        }
        if self.network_passphrase != network.passphrase() {
            return Err(WalletError::InvalidEnvelope(format!(
                "envelope targets '{}' but session is on {}",
                self.network_passphrase, network
            )));
        }
        Ok(())
    }
}

/// 签名后的信封，结构与输入一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub signed_xdr: String,
    pub network_passphrase: String,
    pub signer_address: String,
}
