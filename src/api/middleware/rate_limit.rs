//! 统一速率限制中间件
//! 按调用方身份对 /api 请求执行通用 API 准入策略

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};

use crate::{
    app_state::AppState, domain::rate_limit::RateLimitDecision, error::AppError,
    utils::AddressValidator,
};

/// 速率限制中间件
///
/// 被拒绝的请求返回 429，并与放行的请求一样携带 `X-RateLimit-*` 头。
pub async fn rate_limit_middleware(
    State(st): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let guard = &st.guards.api;
    let rate_limit_key = determine_rate_limit_key(req.headers());

    let decision = guard
        .check(&rate_limit_key)
        .await
        .map_err(|e| AppError::from_wallet_error(e, st.clock.now_ms()))?;
    let limit = guard.policy().max_requests;

    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        AppError::rate_limited(&decision, st.clock.now_ms()).into_response()
    };
    insert_rate_limit_headers(response.headers_mut(), limit, &decision);

    Ok(response)
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, limit: u32, decision: &RateLimitDecision) {
    // 重置时间以秒为单位
    let reset_secs = (decision.reset_time + 999).div_euclid(1000);
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(reset_secs));
}

/// 确定速率限制键
/// 优先级：钱包地址 > API Key > IP地址
pub fn determine_rate_limit_key(headers: &HeaderMap) -> String {
    // 1. 合法的钱包地址
    if let Some(address) = headers
        .get("X-Wallet-Address")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
    {
        if AddressValidator::validate_account(address) {
            return format!("wallet:{}", address);
        }
    }

    // 2. API Key 只保存哈希
    if let Some(key_str) = headers.get("X-API-Key").and_then(|h| h.to_str().ok()) {
        let mut hasher = Sha256::new();
        hasher.update(key_str.as_bytes());
        let key_hash = faster_hex::hex_string(&hasher.finalize());
        return format!("api_key:{}", key_hash);
    }

    // 3. 使用IP地址
    let ip = headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| headers.get("X-Real-IP").and_then(|h| h.to_str().ok()))
        .unwrap_or("unknown");

    format!("ip:{}", ip)
}
