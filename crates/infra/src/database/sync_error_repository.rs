//! SQLite-backed implementation of the append-only sync error log.

use std::sync::Arc;

use async_trait::async_trait;
use daybridge_core::SyncErrorLog;
use daybridge_domain::{Result, SyncErrorRecord};
use rusqlite::params;

use super::row::timestamp_to_sql;
use crate::errors::InfraError;
use crate::storage::pool::get_connection;
use crate::storage::DbPool;

/// SQLite implementation of the sync error log.
pub struct SqliteSyncErrorLog {
    pool: Arc<DbPool>,
}

impl SqliteSyncErrorLog {
    /// Create a new sync error log.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncErrorLog for SqliteSyncErrorLog {
    async fn append(&self, record: &SyncErrorRecord) -> Result<()> {
        let conn = get_connection(&self.pool)?;

        conn.execute(
            "INSERT INTO sync_errors (user_id, provider, message, details, occurred_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.user_id,
                record.provider,
                record.message,
                record.details.to_string(),
                timestamp_to_sql(&record.occurred_at),
            ],
        )
        .map_err(InfraError::from)?;

        Ok(())
    }
}
