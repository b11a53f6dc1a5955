//! SQLite-backed implementation of the TokenStore port.
//!
//! Token columns hold ciphertext only; encryption happens in the token
//! lifecycle manager before rows reach this repository.

use std::sync::Arc;

use async_trait::async_trait;
use daybridge_core::TokenStore;
use daybridge_domain::{OAuthTokenRecord, Result};
use rusqlite::{params, OptionalExtension, Row};
use tracing::instrument;

use super::row::{timestamp_from_sql, timestamp_to_sql};
use crate::errors::InfraError;
use crate::storage::pool::get_connection;
use crate::storage::DbPool;

/// SQLite implementation of the encrypted OAuth token store.
pub struct SqliteTokenRepository {
    pool: Arc<DbPool>,
}

impl SqliteTokenRepository {
    /// Create a new token repository.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<OAuthTokenRecord> {
    Ok(OAuthTokenRecord {
        user_id: row.get(0)?,
        provider: row.get(1)?,
        access_token_encrypted: row.get(2)?,
        refresh_token_encrypted: row.get(3)?,
        token_type: row.get(4)?,
        expires_at: timestamp_from_sql(5, row.get(5)?)?,
        scope: row.get(6)?,
        updated_at: timestamp_from_sql(7, row.get(7)?)?,
    })
}

#[async_trait]
impl TokenStore for SqliteTokenRepository {
    async fn get(&self, user_id: &str, provider: &str) -> Result<Option<OAuthTokenRecord>> {
        let conn = get_connection(&self.pool)?;

        conn.query_row(
            "SELECT user_id, provider, access_token_encrypted, refresh_token_encrypted,
                    token_type, expires_at, scope, updated_at
             FROM oauth_tokens WHERE user_id = ?1 AND provider = ?2",
            params![user_id, provider],
            record_from_row,
        )
        .optional()
        .map_err(|e| InfraError::from(e).into())
    }

    #[instrument(skip(self, record), fields(user_id = %record.user_id, provider = %record.provider))]
    async fn upsert(&self, record: &OAuthTokenRecord) -> Result<()> {
        let conn = get_connection(&self.pool)?;

        conn.execute(
            "INSERT INTO oauth_tokens (
                user_id, provider, access_token_encrypted, refresh_token_encrypted,
                token_type, expires_at, scope, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (user_id, provider) DO UPDATE SET
                access_token_encrypted = excluded.access_token_encrypted,
                refresh_token_encrypted = excluded.refresh_token_encrypted,
                token_type = excluded.token_type,
                expires_at = excluded.expires_at,
                scope = excluded.scope,
                updated_at = excluded.updated_at",
            params![
                record.user_id,
                record.provider,
                record.access_token_encrypted,
                record.refresh_token_encrypted,
                record.token_type,
                timestamp_to_sql(&record.expires_at),
                record.scope,
                timestamp_to_sql(&record.updated_at),
            ],
        )
        .map_err(InfraError::from)?;

        Ok(())
    }

    async fn delete(&self, user_id: &str, provider: &str) -> Result<()> {
        let conn = get_connection(&self.pool)?;

        conn.execute(
            "DELETE FROM oauth_tokens WHERE user_id = ?1 AND provider = ?2",
            params![user_id, provider],
        )
        .map_err(InfraError::from)?;

        Ok(())
    }
}
