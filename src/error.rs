use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{
    domain::{rate_limit::RateLimitDecision, wallet_error::WalletError},
    infrastructure::clock::{Clock, SystemClock},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorCode {
    // HTTP 基础错误码
    BadRequest,
    NotFound,
    RateLimit,
    Timeout,
    Internal,
    CacheError,

    // 钱包错误码
    WalletNotInstalled,
    ProviderNotRegistered,
    InvalidAddress,
    UserRejected,
    ProviderError,
    WalletNotConnected,
    InvalidTransition,
    InvalidEnvelope,
}

impl AppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppErrorCode::BadRequest => "bad_request",
            AppErrorCode::NotFound => "not_found",
            AppErrorCode::RateLimit => "rate_limit",
            AppErrorCode::Timeout => "timeout",
            AppErrorCode::Internal => "internal",
            AppErrorCode::CacheError => "cache_error",
            AppErrorCode::WalletNotInstalled => "wallet_not_installed",
            AppErrorCode::ProviderNotRegistered => "provider_not_registered",
            AppErrorCode::InvalidAddress => "invalid_address",
            AppErrorCode::UserRejected => "user_rejected",
            AppErrorCode::ProviderError => "provider_error",
            AppErrorCode::WalletNotConnected => "wallet_not_connected",
            AppErrorCode::InvalidTransition => "invalid_transition",
            AppErrorCode::InvalidEnvelope => "invalid_envelope",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: String,
    pub status: StatusCode,
    /// 429 响应的 Retry-After 秒数
    pub retry_after: Option<u64>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.as_str(),
            message: &self.message,
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl AppError {
    fn new(code: AppErrorCode, status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            status,
            retry_after: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::BadRequest, StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::NotFound, StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::Internal, StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn cache_error(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::CacheError, StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    /// 准入拒绝，`now_ms` 与判定使用同一时钟
    pub fn rate_limited(decision: &RateLimitDecision, now_ms: i64) -> Self {
        let mut err = Self::new(
            AppErrorCode::RateLimit,
            StatusCode::TOO_MANY_REQUESTS,
            format!("Rate limit exceeded, window resets at {}", decision.reset_time),
        );
        err.retry_after = Some(decision.retry_after_secs(now_ms));
        err
    }
}

impl AppError {
    /// 钱包错误转换，`now_ms` 用于计算 `RateLimited` 的 Retry-After
    ///
    /// 持有注入时钟的调用方应使用此函数，`From` 实现使用系统时钟。
    pub fn from_wallet_error(err: WalletError, now_ms: i64) -> Self {
        let message = err.to_string();
        match err {
            WalletError::NotInstalled => {
                Self::new(AppErrorCode::WalletNotInstalled, StatusCode::BAD_REQUEST, message)
            }
            WalletError::NotRegistered(_) => {
                Self::new(AppErrorCode::ProviderNotRegistered, StatusCode::NOT_FOUND, message)
            }
            WalletError::InvalidIdentity(_) => {
                Self::new(AppErrorCode::InvalidAddress, StatusCode::BAD_REQUEST, message)
            }
            WalletError::UserRejected => {
                Self::new(AppErrorCode::UserRejected, StatusCode::FORBIDDEN, message)
            }
            WalletError::Timeout(_) => {
                Self::new(AppErrorCode::Timeout, StatusCode::GATEWAY_TIMEOUT, message)
            }
            WalletError::ProviderError(_) => {
                Self::new(AppErrorCode::ProviderError, StatusCode::BAD_GATEWAY, message)
            }
            WalletError::NotConnected => {
                Self::new(AppErrorCode::WalletNotConnected, StatusCode::CONFLICT, message)
            }
            WalletError::InvalidTransition { .. } => {
                Self::new(AppErrorCode::InvalidTransition, StatusCode::CONFLICT, message)
            }
            WalletError::InvalidEnvelope(_) => {
                Self::new(AppErrorCode::InvalidEnvelope, StatusCode::BAD_REQUEST, message)
            }
            WalletError::RateLimited { reset_time } => {
                let decision = RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    reset_time,
                };
                Self::rate_limited(&decision, now_ms)
            }
            WalletError::Store(_) => Self::cache_error(message),
        }
    }
}

impl From<WalletError> for AppError {
    fn from(err: WalletError) -> Self {
        Self::from_wallet_error(err, SystemClock.now_ms())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(format!("Invalid JSON: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}
