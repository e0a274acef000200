//! 交易签名委托
//!
//! 签名只读取会话状态，无论成功失败都不会改变会话。

use std::time::Duration;

use crate::{
    config::WalletConfig,
    domain::{
        envelope::{SignedEnvelope, TransactionEnvelope},
        wallet_error::WalletError,
    },
    service::wallet_session::WalletSession,
};

pub struct TransactionSigner {
    session: WalletSession,
    sign_timeout: Duration,
}

impl TransactionSigner {
    pub fn new(session: WalletSession, sign_timeout: Duration) -> Self {
        Self {
            session,
            sign_timeout,
        }
    }

    pub fn from_config(session: WalletSession, config: &WalletConfig) -> Self {
        Self::new(session, Duration::from_millis(config.sign_timeout_ms))
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    /// 用会话绑定的 provider 签名
    pub async fn sign(&self, envelope: &TransactionEnvelope) -> Result<SignedEnvelope, WalletError> {
        let (provider, identity) = self
            .session
            .bound_provider()
            .ok_or(WalletError::NotConnected)?;

        if let Err(e) = envelope.validate_for(self.session.network()) {
            tracing::error!(
                provider_id = provider.id(),
                error = %e,
                "refusing to sign malformed envelope"
            );
            return Err(e);
        }

        tracing::debug!(
            provider_id = provider.id(),
            address = %identity.short(),
            "delegating signature request"
        );

        match tokio::time::timeout(self.sign_timeout, provider.sign(envelope, &identity)).await {
            Ok(Ok(signed)) => Ok(signed),
            Ok(Err(WalletError::UserRejected)) => Err(WalletError::UserRejected),
            Ok(Err(WalletError::ProviderError(message))) => Err(WalletError::ProviderError(message)),
            Ok(Err(other)) => Err(WalletError::ProviderError(other.to_string())),
            Err(_) => Err(WalletError::timed_out(self.sign_timeout)),
        }
    }
}
