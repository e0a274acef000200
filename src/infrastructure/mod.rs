pub mod cache;
pub mod clock;
pub mod extension;
pub mod logging;
pub mod rate_limit_store;
pub mod wallet_adapters;
