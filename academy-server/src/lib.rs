//! academy-server - HTTP API and Postgres storage for academy
//!
//! Layers, bottom up:
//! - `models`: validated request values (slugs, titles, pagination)
//! - `db`: pool, idempotent migrations, repositories
//! - `http`: axum router, bearer auth, JSON errors

pub mod db;
pub mod http;
pub mod models;
