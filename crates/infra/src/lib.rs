//! # Daybridge Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite-backed repositories for the canonical stores
//! - HTTP clients for the lifelog and calendar providers
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `daybridge-core`
//! - Depends on `daybridge-domain` and `daybridge-core`
//! - Contains all "impure" code (I/O, HTTP, SQL)

pub mod config;
pub mod database;
pub mod errors;
pub mod providers;
pub mod storage;

// Re-export commonly used items
pub use config::*;
pub use database::*;
pub use errors::*;
pub use providers::*;
pub use storage::*;
