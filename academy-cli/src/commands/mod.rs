//! Command implementations for the academy CLI

pub mod config;
pub mod grant;
pub mod migrate;
pub mod serve;
pub mod token;

pub use config::run_config;
pub use grant::run_grant;
pub use migrate::run_migrate;
pub use serve::run_serve;
pub use token::run_token;
