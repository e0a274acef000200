//! Domain 模块
//!
//! 钱包身份、provider 契约、会话状态、交易信封与速率限制模型

pub mod envelope;
pub mod identity;
pub mod provider;
pub mod rate_limit;
pub mod session;
pub mod wallet_error;

// 重新导出常用类型
pub use envelope::{SignedEnvelope, TransactionEnvelope, WalletNetwork};
pub use identity::Identity;
pub use provider::{ProviderDescriptor, WalletKind, WalletProvider};
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimitRecord};
pub use session::{SessionSnapshot, SessionStatus};
pub use wallet_error::{ErrorKind, WalletError};
