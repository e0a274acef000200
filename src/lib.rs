//! Harmonia - DAO 治理面板的钱包连接、交易签名与请求准入控制核心
//!
//! 后端不接触私钥：签名始终委托给用户的钱包扩展

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{AppError, AppErrorCode};

pub mod prelude {
    pub use crate::{
        app_state::AppState,
        domain::{
            ErrorKind, Identity, SessionSnapshot, SessionStatus, TransactionEnvelope,
            WalletError, WalletNetwork, WalletProvider,
        },
        error::{AppError, AppErrorCode},
        service::{
            AdmissionGuard, AdmissionGuards, GuardSurface, ProviderRegistry, SessionConfig,
            TransactionSigner, WalletSession,
        },
    };
}
