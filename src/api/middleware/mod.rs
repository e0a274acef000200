pub mod rate_limit;

pub use rate_limit::{determine_rate_limit_key, rate_limit_middleware};
