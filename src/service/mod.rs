pub mod admission_guard;
pub mod provider_registry;
pub mod transaction_signer;
pub mod wallet_session;

pub use admission_guard::{AdmissionGuard, AdmissionGuards, GuardSurface};
pub use provider_registry::{AvailableProviders, ProviderRegistry};
pub use transaction_signer::TransactionSigner;
pub use wallet_session::{SessionConfig, WalletSession};
