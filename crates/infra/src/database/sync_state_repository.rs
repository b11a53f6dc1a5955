//! SQLite-backed implementation of the SyncStateStore port.

use std::sync::Arc;

use async_trait::async_trait;
use daybridge_core::SyncStateStore;
use daybridge_domain::{Result, SyncState};
use rusqlite::{params, OptionalExtension, Row};
use tracing::instrument;

use super::row::{
    date_opt_from_sql, date_opt_to_sql, timestamp_opt_from_sql, timestamp_opt_to_sql,
};
use crate::errors::InfraError;
use crate::storage::pool::get_connection;
use crate::storage::DbPool;

/// SQLite implementation of the per-(user, provider) sync bookmark store.
pub struct SqliteSyncStateRepository {
    pool: Arc<DbPool>,
}

impl SqliteSyncStateRepository {
    /// Create a new sync state repository.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

fn state_from_row(row: &Row<'_>) -> rusqlite::Result<SyncState> {
    Ok(SyncState {
        user_id: row.get(0)?,
        provider: row.get(1)?,
        last_sync_date: date_opt_from_sql(2, row.get(2)?)?,
        next_sync_token: row.get(3)?,
        calendar_id: row.get(4)?,
        last_cursor: row.get(5)?,
        total_synced: row.get(6)?,
        events_imported: row.get(7)?,
        events_exported: row.get(8)?,
        conflicts_detected: row.get(9)?,
        full_sync_completed: row.get(10)?,
        last_sync_at: timestamp_opt_from_sql(11, row.get(11)?)?,
        last_successful_sync_at: timestamp_opt_from_sql(12, row.get(12)?)?,
        error_count: row.get(13)?,
    })
}

#[async_trait]
impl SyncStateStore for SqliteSyncStateRepository {
    async fn get(&self, user_id: &str, provider: &str) -> Result<Option<SyncState>> {
        let conn = get_connection(&self.pool)?;

        conn.query_row(
            "SELECT user_id, provider, last_sync_date, next_sync_token, calendar_id,
                    last_cursor, total_synced, events_imported, events_exported,
                    conflicts_detected, full_sync_completed, last_sync_at,
                    last_successful_sync_at, error_count
             FROM sync_state WHERE user_id = ?1 AND provider = ?2",
            params![user_id, provider],
            state_from_row,
        )
        .optional()
        .map_err(|e| InfraError::from(e).into())
    }

    #[instrument(skip(self, state), fields(user_id = %state.user_id, provider = %state.provider))]
    async fn upsert(&self, state: &SyncState) -> Result<()> {
        let conn = get_connection(&self.pool)?;

        conn.execute(
            "INSERT INTO sync_state (
                user_id, provider, last_sync_date, next_sync_token, calendar_id,
                last_cursor, total_synced, events_imported, events_exported,
                conflicts_detected, full_sync_completed, last_sync_at,
                last_successful_sync_at, error_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT (user_id, provider) DO UPDATE SET
                last_sync_date = excluded.last_sync_date,
                next_sync_token = excluded.next_sync_token,
                calendar_id = excluded.calendar_id,
                last_cursor = excluded.last_cursor,
                total_synced = excluded.total_synced,
                events_imported = excluded.events_imported,
                events_exported = excluded.events_exported,
                conflicts_detected = excluded.conflicts_detected,
                full_sync_completed = excluded.full_sync_completed,
                last_sync_at = excluded.last_sync_at,
                last_successful_sync_at = excluded.last_successful_sync_at,
                error_count = excluded.error_count",
            params![
                state.user_id,
                state.provider,
                date_opt_to_sql(&state.last_sync_date),
                state.next_sync_token,
                state.calendar_id,
                state.last_cursor,
                state.total_synced,
                state.events_imported,
                state.events_exported,
                state.conflicts_detected,
                state.full_sync_completed,
                timestamp_opt_to_sql(&state.last_sync_at),
                timestamp_opt_to_sql(&state.last_successful_sync_at),
                state.error_count,
            ],
        )
        .map_err(InfraError::from)?;

        Ok(())
    }

    async fn delete(&self, user_id: &str, provider: &str) -> Result<()> {
        let conn = get_connection(&self.pool)?;

        conn.execute(
            "DELETE FROM sync_state WHERE user_id = ?1 AND provider = ?2",
            params![user_id, provider],
        )
        .map_err(InfraError::from)?;

        Ok(())
    }
}
