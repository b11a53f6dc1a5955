//! # Daybridge Domain
//!
//! Business domain types for the Daybridge sync engine.
//!
//! This crate contains:
//! - Canonical event/transcript/sync-state models
//! - Domain error types and Result definitions
//! - Provider-facing value types (lifelog entries, token sets)
//!
//! ## Architecture
//! - No dependencies on other Daybridge crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
