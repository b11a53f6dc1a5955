//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Daybridge
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DaybridgeError {
    /// A remote provider call failed (network, 4xx/5xx, rate limit).
    #[error("Provider error: {0}")]
    Provider(String),

    /// The stored incremental sync token was rejected by the provider
    /// (HTTP 410 GONE). It must be discarded and a full pull retried.
    #[error("Sync token rejected by provider: {0}")]
    SyncTokenGone(String),

    /// A local store read or write failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Authentication against a provider failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// No usable access token and no way to refresh one. Callers should
    /// route the user to re-authentication rather than surface a generic
    /// failure.
    #[error("No valid token for provider: {0}")]
    NoValidToken(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Export target missing or already gone on the remote side.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DaybridgeError {
    /// Whether this error signals that the stored sync token was rejected
    /// by the provider and must be discarded.
    pub fn is_sync_token_gone(&self) -> bool {
        matches!(self, Self::SyncTokenGone(_))
    }
}

/// Result type alias for Daybridge operations
pub type Result<T> = std::result::Result<T, DaybridgeError>;
