//! Database layer - connection pool, migrations and repositories
//!
//! # Design Principles
//!
//! - Connection pool, never a shared connection behind a mutex
//! - Rely on DB constraints and handle conflicts, no check-then-insert
//! - Multi-step progression updates run in one transaction with the
//!   enrollment row locked

pub mod migrations;
pub mod pool;
pub mod repos;

pub use pool::{create_pool, create_pool_with_options, ping};
pub use repos::*;
