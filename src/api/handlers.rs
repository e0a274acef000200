use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    api::response::{success_response, ApiResponse},
    app_state::AppState,
    domain::{envelope::WalletNetwork, provider::WalletKind, ProviderDescriptor},
    error::AppError,
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// 准入记录存储后端（memory / redis）
    pub store: String,
    pub version: String,
}

pub async fn api_health(
    State(st): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HealthResponse>>, AppError> {
    success_response(HealthResponse {
        status: "ok".into(),
        store: st.store.backend().into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

#[derive(Debug, Serialize)]
pub struct NetworkInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub passphrase: &'static str,
    pub horizon_url: &'static str,
    pub soroban_rpc_url: &'static str,
    pub is_mainnet: bool,
    /// 当前配置的默认网络
    pub is_default: bool,
}

pub async fn list_networks(
    State(st): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<NetworkInfo>>>, AppError> {
    let default = st.config.wallet.network();
    let networks = WalletNetwork::ALL
        .iter()
        .map(|network| NetworkInfo {
            id: network.as_str(),
            name: network.display_name(),
            passphrase: network.passphrase(),
            horizon_url: network.horizon_url(),
            soroban_rpc_url: network.soroban_rpc_url(),
            is_mainnet: network.is_mainnet(),
            is_default: *network == default,
        })
        .collect();
    success_response(networks)
}

/// 支持的钱包扩展，按默认探测优先级排列
pub async fn list_wallets() -> Result<Json<ApiResponse<Vec<ProviderDescriptor>>>, AppError> {
    success_response(WalletKind::ALL.iter().map(WalletKind::descriptor).collect())
}
