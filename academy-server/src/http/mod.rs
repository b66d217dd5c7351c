//! JSON API over axum
//!
//! Requests carry an HS256 bearer token; `extractors::AuthUser` verifies it
//! and resolves the caller's stored role. Handlers return `ApiError`, which
//! renders `{error, message}` bodies with 400/401/403/404/409/500.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{router, run_server, AppState, ServerConfig, ServerError};
