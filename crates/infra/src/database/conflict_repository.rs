//! SQLite-backed implementation of the ConflictStore port.

use std::sync::Arc;

use async_trait::async_trait;
use daybridge_core::ConflictStore;
use daybridge_domain::{DaybridgeError, Result, SyncConflict};
use rusqlite::{params, Row};
use tracing::instrument;

use super::row::{timestamp_from_sql, timestamp_to_sql};
use crate::errors::InfraError;
use crate::storage::pool::get_connection;
use crate::storage::DbPool;

/// SQLite implementation of the conflict store.
pub struct SqliteConflictRepository {
    pool: Arc<DbPool>,
}

impl SqliteConflictRepository {
    /// Create a new conflict repository.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

fn conflict_from_row(row: &Row<'_>) -> rusqlite::Result<SyncConflict> {
    Ok(SyncConflict {
        id: row.get(0)?,
        user_id: row.get(1)?,
        event_id: row.get(2)?,
        conflicting_event_id: row.get(3)?,
        description: row.get(4)?,
        resolved: row.get(5)?,
        resolution: row.get(6)?,
        notes: row.get(7)?,
        detected_at: timestamp_from_sql(8, row.get(8)?)?,
    })
}

#[async_trait]
impl ConflictStore for SqliteConflictRepository {
    #[instrument(skip(self, conflict), fields(user_id = %conflict.user_id))]
    async fn upsert(&self, conflict: &SyncConflict) -> Result<SyncConflict> {
        let conn = get_connection(&self.pool)?;

        // Re-detection refreshes description and timestamp but never touches
        // the resolution fields of an already-resolved row. The RETURNING
        // clause hands back the stored row, original id included, so callers
        // never see a phantom id for a pair that already exists.
        let stored = conn
            .query_row(
                "INSERT INTO sync_conflicts (
                    id, user_id, event_id, conflicting_event_id, description,
                    resolved, resolution, notes, detected_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT (user_id, event_id, conflicting_event_id) DO UPDATE SET
                    description = excluded.description,
                    detected_at = excluded.detected_at
                RETURNING id, user_id, event_id, conflicting_event_id, description,
                          resolved, resolution, notes, detected_at",
                params![
                    conflict.id,
                    conflict.user_id,
                    conflict.event_id,
                    conflict.conflicting_event_id,
                    conflict.description,
                    conflict.resolved,
                    conflict.resolution,
                    conflict.notes,
                    timestamp_to_sql(&conflict.detected_at),
                ],
                conflict_from_row,
            )
            .map_err(InfraError::from)?;

        Ok(stored)
    }

    async fn list_unresolved(&self, user_id: &str) -> Result<Vec<SyncConflict>> {
        let conn = get_connection(&self.pool)?;

        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, event_id, conflicting_event_id, description,
                        resolved, resolution, notes, detected_at
                 FROM sync_conflicts
                 WHERE user_id = ?1 AND resolved = 0
                 ORDER BY detected_at DESC",
            )
            .map_err(InfraError::from)?;

        let conflicts = stmt
            .query_map(params![user_id], conflict_from_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;

        Ok(conflicts)
    }

    #[instrument(skip(self), fields(user_id, conflict_id))]
    async fn resolve(
        &self,
        user_id: &str,
        conflict_id: &str,
        resolution: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        let conn = get_connection(&self.pool)?;

        let updated = conn
            .execute(
                "UPDATE sync_conflicts SET resolved = 1, resolution = ?3, notes = ?4
                 WHERE user_id = ?1 AND id = ?2",
                params![user_id, conflict_id, resolution, notes],
            )
            .map_err(InfraError::from)?;

        if updated == 0 {
            return Err(DaybridgeError::NotFound(format!("conflict {conflict_id}")));
        }
        Ok(())
    }
}
