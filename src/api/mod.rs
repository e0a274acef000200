use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{api::middleware::rate_limit_middleware, app_state::AppState};

pub mod admission_api;
pub mod handlers;
pub mod middleware;
pub mod response; // 统一响应格式

/// 构建应用路由
///
/// 所有 /api 路由都经过通用 API 准入检查。
pub fn routes(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::api_health))
        .route("/networks", get(handlers::list_networks))
        .route("/wallets", get(handlers::list_wallets))
        .nest("/admission", admission_api::routes())
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
