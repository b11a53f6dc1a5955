//! OAuth token types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Decrypted OAuth token pair as used by the engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub scope: Option<String>,
}

impl TokenSet {
    /// Whether the access token is expired or will expire within
    /// `threshold_seconds`.
    pub fn is_expired(&self, threshold_seconds: i64) -> bool {
        Utc::now() >= self.expires_at - Duration::seconds(threshold_seconds)
    }

    /// Seconds until expiry; negative when already expired.
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }
}

/// Encrypted token row as persisted. One live record per (user, provider);
/// replaced in place on refresh, removed on disconnect.
#[derive(Debug, Clone)]
pub struct OAuthTokenRecord {
    pub user_id: String,
    pub provider: String,
    pub access_token_encrypted: String,
    pub refresh_token_encrypted: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub scope: Option<String>,
    pub updated_at: DateTime<Utc>,
}
