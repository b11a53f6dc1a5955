//! OAuth token lifecycle management
//!
//! Owns encrypted credential storage, refresh-before-expiry, and
//! revocation for the calendar provider. The calendar engine consults this
//! before every remote call.

use std::sync::Arc;

use chrono::Utc;
use daybridge_domain::{provider, DaybridgeError, OAuthTokenRecord, Result, TokenSet};
use tracing::{debug, info, instrument, warn};

use crate::provider_ports::{OAuthApi, TokenCipher};
use crate::store_ports::{SyncStateStore, TokenStore};

/// Refresh the access token this many seconds before its expiry.
const REFRESH_THRESHOLD_SECONDS: i64 = 300;

/// Manages one encrypted access/refresh token pair per (user, provider).
pub struct TokenLifecycleManager {
    oauth: Arc<dyn OAuthApi>,
    cipher: Arc<dyn TokenCipher>,
    tokens: Arc<dyn TokenStore>,
    sync_state: Arc<dyn SyncStateStore>,
}

impl TokenLifecycleManager {
    /// Create a new manager.
    pub fn new(
        oauth: Arc<dyn OAuthApi>,
        cipher: Arc<dyn TokenCipher>,
        tokens: Arc<dyn TokenStore>,
        sync_state: Arc<dyn SyncStateStore>,
    ) -> Self {
        Self { oauth, cipher, tokens, sync_state }
    }

    /// Exchange an authorization code and persist the encrypted token pair.
    #[instrument(skip(self, auth_code), fields(user_id))]
    pub async fn connect(&self, user_id: &str, auth_code: &str) -> Result<TokenSet> {
        let token_set = self.oauth.exchange_code(auth_code).await?;
        self.store_token_set(user_id, &token_set).await?;

        info!(user_id, "calendar provider connected");
        Ok(token_set)
    }

    /// Return a valid access token, refreshing it first when it is inside
    /// the expiry window.
    ///
    /// Degrades to [`DaybridgeError::NoValidToken`] whenever no usable token
    /// can be produced — no stored record, an expired token without a
    /// refresh token, or a failed refresh — so callers can route the user to
    /// re-authentication instead of a generic failure.
    #[instrument(skip(self), fields(user_id))]
    pub async fn access_token(&self, user_id: &str) -> Result<String> {
        let record = self
            .tokens
            .get(user_id, provider::CALENDAR)
            .await?
            .ok_or_else(|| DaybridgeError::NoValidToken(provider::CALENDAR.to_string()))?;

        let access_token = self.cipher.decrypt(&record.access_token_encrypted)?;

        let expires_soon =
            Utc::now() >= record.expires_at - chrono::Duration::seconds(REFRESH_THRESHOLD_SECONDS);
        if !expires_soon {
            return Ok(access_token);
        }

        let Some(refresh_encrypted) = record.refresh_token_encrypted.as_deref() else {
            debug!(user_id, "access token expired and no refresh token stored");
            return Err(DaybridgeError::NoValidToken(provider::CALENDAR.to_string()));
        };

        let refresh_token = self.cipher.decrypt(refresh_encrypted)?;
        let refreshed = match self.oauth.refresh_token(&refresh_token).await {
            Ok(set) => set,
            Err(err) => {
                warn!(user_id, error = %err, "token refresh failed");
                return Err(DaybridgeError::NoValidToken(provider::CALENDAR.to_string()));
            }
        };

        // Replace the access token and expiry in place; the refresh token is
        // kept unless the provider rotated it.
        let new_refresh = match refreshed.refresh_token.as_deref() {
            Some(rotated) => Some(self.cipher.encrypt(rotated)?),
            None => record.refresh_token_encrypted.clone(),
        };

        let updated = OAuthTokenRecord {
            user_id: record.user_id,
            provider: record.provider,
            access_token_encrypted: self.cipher.encrypt(&refreshed.access_token)?,
            refresh_token_encrypted: new_refresh,
            token_type: refreshed.token_type.clone(),
            expires_at: refreshed.expires_at,
            scope: refreshed.scope.clone().or(record.scope),
            updated_at: Utc::now(),
        };
        self.tokens.upsert(&updated).await?;

        info!(user_id, "access token refreshed");
        Ok(refreshed.access_token)
    }

    /// Whether a token record exists for the user.
    pub async fn is_connected(&self, user_id: &str) -> Result<bool> {
        Ok(self.tokens.get(user_id, provider::CALENDAR).await?.is_some())
    }

    /// Revoke the access token remotely (best-effort) and delete the token
    /// record plus sync state. A failed revocation never blocks local
    /// deletion.
    #[instrument(skip(self), fields(user_id))]
    pub async fn disconnect(&self, user_id: &str) -> Result<()> {
        if let Some(record) = self.tokens.get(user_id, provider::CALENDAR).await? {
            match self.cipher.decrypt(&record.access_token_encrypted) {
                Ok(access_token) => {
                    if let Err(err) = self.oauth.revoke_token(&access_token).await {
                        warn!(user_id, error = %err, "token revocation failed, continuing");
                    }
                }
                Err(err) => {
                    warn!(user_id, error = %err, "could not decrypt token for revocation");
                }
            }
        }

        self.tokens.delete(user_id, provider::CALENDAR).await?;
        self.sync_state.delete(user_id, provider::CALENDAR).await?;

        info!(user_id, "calendar provider disconnected");
        Ok(())
    }

    async fn store_token_set(&self, user_id: &str, token_set: &TokenSet) -> Result<()> {
        let refresh_encrypted = match token_set.refresh_token.as_deref() {
            Some(token) => Some(self.cipher.encrypt(token)?),
            None => None,
        };

        let record = OAuthTokenRecord {
            user_id: user_id.to_string(),
            provider: provider::CALENDAR.to_string(),
            access_token_encrypted: self.cipher.encrypt(&token_set.access_token)?,
            refresh_token_encrypted: refresh_encrypted,
            token_type: token_set.token_type.clone(),
            expires_at: token_set.expires_at,
            scope: token_set.scope.clone(),
            updated_at: Utc::now(),
        };

        self.tokens.upsert(&record).await
    }
}
