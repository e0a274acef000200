//! 准入控制 API
//!
//! 供 BFF 在执行投票、国库操作等写操作前调用。

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::response::{success_response, ApiResponse},
    app_state::AppState,
    error::AppError,
    service::admission_guard::AdmissionGuard,
};

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub surface: String,
    pub key: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:surface/check", post(check_admission))
        .route("/:surface/:key", delete(reset_admission))
}

fn guard_for<'a>(st: &'a AppState, surface: &str) -> Result<&'a AdmissionGuard, AppError> {
    st.guards
        .by_name(surface)
        .ok_or_else(|| AppError::not_found(format!("Unknown admission surface: {}", surface)))
}

/// POST /api/admission/:surface/check
///
/// 允许时 200，拒绝时 429 + Retry-After，两者响应体相同。
pub async fn check_admission(
    State(st): State<Arc<AppState>>,
    Path(surface): Path<String>,
    Json(req): Json<CheckRequest>,
) -> Result<Response, AppError> {
    let guard = guard_for(&st, &surface)?;
    let key = req.key.trim();
    if key.is_empty() {
        return Err(AppError::bad_request("key must not be empty"));
    }

    let decision = guard
        .check(key)
        .await
        .map_err(|e| AppError::from_wallet_error(e, st.clock.now_ms()))?;
    if decision.allowed {
        return Ok(Json(ApiResponse::success(decision)).into_response());
    }

    let retry_after = decision.retry_after_secs(st.clock.now_ms());
    let body = ApiResponse::with_code(429, "rate limit exceeded", decision);
    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    Ok(response)
}

/// DELETE /api/admission/:surface/:key
pub async fn reset_admission(
    State(st): State<Arc<AppState>>,
    Path((surface, key)): Path<(String, String)>,
) -> Result<Json<ApiResponse<ResetResponse>>, AppError> {
    let guard = guard_for(&st, &surface)?;
    guard
        .reset(&key)
        .await
        .map_err(|e| AppError::from_wallet_error(e, st.clock.now_ms()))?;
    success_response(ResetResponse {
        surface: guard.surface().to_string(),
        key,
    })
}
