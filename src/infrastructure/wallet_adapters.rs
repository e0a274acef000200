//! 钱包扩展适配器
//!
//! 每种 [`WalletKind`] 通过自己的 [`ExtensionBridge`] 实现 [`WalletProvider`] 契约。
//! 各扩展的原始错误在这里统一归一化，上层只会看到 [`WalletError`]。

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{
        envelope::{SignedEnvelope, TransactionEnvelope},
        identity::Identity,
        provider::{ProviderDescriptor, WalletKind, WalletProvider},
        wallet_error::WalletError,
    },
    infrastructure::extension::{BridgeError, ExtensionBridge},
};

const REJECTION_MARKERS: &[&str] = &["reject", "declin", "denied", "cancel", "modal closed"];
const NOT_INSTALLED_MARKERS: &[&str] = &["not installed", "not available", "not detected"];
const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out"];

/// 触发归一化的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeOperation {
    Detect,
    Connect,
    Sign,
    Disconnect,
}

/// 扩展专有的"用户拒绝"错误码
fn rejection_codes(kind: WalletKind) -> &'static [i64] {
    match kind {
        WalletKind::Freighter | WalletKind::Albedo => &[-4],
        _ => &[],
    }
}

/// 将扩展原始错误归一化
///
/// 签名只允许产生 `UserRejected` / `ProviderError`；
/// 连接额外区分 `NotInstalled` 与 `Timeout`。
pub fn normalize_bridge_error(
    kind: WalletKind,
    operation: BridgeOperation,
    err: &BridgeError,
) -> WalletError {
    let message = err.message.to_lowercase();
    let contains_any = |markers: &[&str]| markers.iter().any(|m| message.contains(m));

    let rejected = err
        .code
        .map(|code| rejection_codes(kind).contains(&code))
        .unwrap_or(false)
        || contains_any(REJECTION_MARKERS);
    if rejected && operation != BridgeOperation::Detect {
        return WalletError::UserRejected;
    }

    if operation == BridgeOperation::Connect {
        if contains_any(NOT_INSTALLED_MARKERS) {
            return WalletError::NotInstalled;
        }
        if contains_any(TIMEOUT_MARKERS) {
            return WalletError::Timeout(format!("{} reported: {}", kind.display_name(), err));
        }
    }

    WalletError::ProviderError(format!("{}: {}", kind.display_name(), err))
}

/// 基于扩展桥接的 provider
pub struct ExtensionAdapter {
    kind: WalletKind,
    descriptor: ProviderDescriptor,
    bridge: Arc<dyn ExtensionBridge>,
}

impl ExtensionAdapter {
    pub fn new(kind: WalletKind, bridge: Arc<dyn ExtensionBridge>) -> Self {
        Self {
            kind,
            descriptor: kind.descriptor(),
            bridge,
        }
    }

    pub fn kind(&self) -> WalletKind {
        self.kind
    }

    fn normalize(&self, operation: BridgeOperation, err: BridgeError) -> WalletError {
        let normalized = normalize_bridge_error(self.kind, operation, &err);
        tracing::debug!(
            wallet = self.kind.id(),
            ?operation,
            raw_code = ?err.code,
            raw_message = %err.message,
            error = %normalized,
            "normalized extension error"
        );
        normalized
    }
}

#[async_trait]
impl WalletProvider for ExtensionAdapter {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn detect(&self) -> Result<bool, WalletError> {
        self.bridge
            .is_injected()
            .map_err(|e| self.normalize(BridgeOperation::Detect, e))
    }

    async fn connect(&self) -> Result<String, WalletError> {
        // 未注入时不发起请求
        if !self.detect().unwrap_or(false) {
            return Err(WalletError::NotInstalled);
        }

        self.bridge
            .request_public_key()
            .await
            .map_err(|e| self.normalize(BridgeOperation::Connect, e))
    }

    async fn sign(
        &self,
        envelope: &TransactionEnvelope,
        identity: &Identity,
    ) -> Result<SignedEnvelope, WalletError> {
        let signed_xdr = self
            .bridge
            .sign_transaction(
                &envelope.xdr,
                &envelope.network_passphrase,
                identity.public_key(),
            )
            .await
            .map_err(|e| self.normalize(BridgeOperation::Sign, e))?;

        if signed_xdr.trim().is_empty() {
            return Err(WalletError::ProviderError(format!(
                "{}: extension returned an empty signed envelope",
                self.kind.display_name()
            )));
        }

        Ok(SignedEnvelope {
            signed_xdr,
            network_passphrase: envelope.network_passphrase.clone(),
            signer_address: identity.public_key().to_string(),
        })
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        self.bridge
            .forget()
            .await
            .map_err(|e| self.normalize(BridgeOperation::Disconnect, e))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::envelope::WalletNetwork;

    const ADDRESS: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";

    struct ScriptedBridge {
        injected: bool,
        connect_result: Result<String, BridgeError>,
        sign_result: Result<String, BridgeError>,
        sign_calls: Mutex<Vec<(String, String, String)>>,
    }

    impl ScriptedBridge {
        fn ok() -> Self {
            Self {
                injected: true,
                connect_result: Ok(ADDRESS.to_string()),
                sign_result: Ok("AAAAsigned".to_string()),
                sign_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExtensionBridge for ScriptedBridge {
        fn is_injected(&self) -> Result<bool, BridgeError> {
            Ok(self.injected)
        }

        async fn request_public_key(&self) -> Result<String, BridgeError> {
            self.connect_result.clone()
        }

        async fn sign_transaction(
            &self,
            xdr: &str,
            network_passphrase: &str,
            address: &str,
        ) -> Result<String, BridgeError> {
            self.sign_calls.lock().unwrap().push((
                xdr.to_string(),
                network_passphrase.to_string(),
                address.to_string(),
            ));
            self.sign_result.clone()
        }
    }

    #[test]
    fn test_normalize_rejection_by_code() {
        let err = BridgeError::with_code(-4, "request failed");
        assert_eq!(
            normalize_bridge_error(WalletKind::Freighter, BridgeOperation::Connect, &err),
            WalletError::UserRejected
        );
        // xBull 没有 -4 语义，按普通故障处理
        assert!(matches!(
            normalize_bridge_error(WalletKind::XBull, BridgeOperation::Connect, &err),
            WalletError::ProviderError(_)
        ));
    }

    #[test]
    fn test_normalize_by_message() {
        let rejected = BridgeError::new("User declined access");
        assert_eq!(
            normalize_bridge_error(WalletKind::Lobstr, BridgeOperation::Sign, &rejected),
            WalletError::UserRejected
        );

        let closed = BridgeError::new("Modal closed");
        assert_eq!(
            normalize_bridge_error(WalletKind::XBull, BridgeOperation::Connect, &closed),
            WalletError::UserRejected
        );

        let missing = BridgeError::new("Rabet is not installed");
        assert_eq!(
            normalize_bridge_error(WalletKind::Rabet, BridgeOperation::Connect, &missing),
            WalletError::NotInstalled
        );

        let slow = BridgeError::new("Request timed out");
        assert!(matches!(
            normalize_bridge_error(WalletKind::Albedo, BridgeOperation::Connect, &slow),
            WalletError::Timeout(_)
        ));
    }

    #[test]
    fn test_sign_only_yields_rejected_or_provider_error() {
        let missing = BridgeError::new("extension not installed");
        assert!(matches!(
            normalize_bridge_error(WalletKind::Freighter, BridgeOperation::Sign, &missing),
            WalletError::ProviderError(_)
        ));

        let slow = BridgeError::new("timeout");
        assert!(matches!(
            normalize_bridge_error(WalletKind::Freighter, BridgeOperation::Sign, &slow),
            WalletError::ProviderError(_)
        ));
    }

    #[tokio::test]
    async fn test_connect_requires_injection() {
        let bridge = ScriptedBridge {
            injected: false,
            ..ScriptedBridge::ok()
        };
        let adapter = ExtensionAdapter::new(WalletKind::Freighter, Arc::new(bridge));
        assert_eq!(adapter.detect(), Ok(false));
        assert_eq!(adapter.connect().await, Err(WalletError::NotInstalled));
    }

    #[tokio::test]
    async fn test_connect_returns_raw_public_key() {
        let adapter = ExtensionAdapter::new(WalletKind::Albedo, Arc::new(ScriptedBridge::ok()));
        assert_eq!(adapter.id(), "albedo");
        assert_eq!(adapter.connect().await.unwrap(), ADDRESS);
    }

    #[tokio::test]
    async fn test_sign_passes_envelope_and_address() {
        let bridge = Arc::new(ScriptedBridge::ok());
        let adapter = ExtensionAdapter::new(WalletKind::Freighter, bridge.clone());
        let identity = Identity::parse(ADDRESS).unwrap();
        let envelope = TransactionEnvelope::new("AAAAunsigned", WalletNetwork::Testnet);

        let signed = adapter.sign(&envelope, &identity).await.unwrap();
        assert_eq!(signed.signed_xdr, "AAAAsigned");
        assert_eq!(signed.network_passphrase, WalletNetwork::Testnet.passphrase());
        assert_eq!(signed.signer_address, ADDRESS);

        let calls = bridge.sign_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "AAAAunsigned");
        assert_eq!(calls[0].2, ADDRESS);
    }

    #[tokio::test]
    async fn test_sign_rejects_empty_result() {
        let bridge = ScriptedBridge {
            sign_result: Ok("  ".to_string()),
            ..ScriptedBridge::ok()
        };
        let adapter = ExtensionAdapter::new(WalletKind::Hana, Arc::new(bridge));
        let identity = Identity::parse(ADDRESS).unwrap();
        let envelope = TransactionEnvelope::new("AAAA", WalletNetwork::Testnet);

        assert!(matches!(
            adapter.sign(&envelope, &identity).await,
            Err(WalletError::ProviderError(_))
        ));
    }
}
