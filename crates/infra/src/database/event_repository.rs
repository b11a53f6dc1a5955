//! SQLite-backed implementation of the EventStore port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use daybridge_core::{EventStore, ExportOutcome};
use daybridge_domain::{CanonicalEvent, DaybridgeError, EventSource, Result};
use rusqlite::{params, OptionalExtension, Row, ToSql};
use tracing::{debug, instrument};

use super::row::{
    source_from_sql, status_from_sql, string_list_from_sql, timestamp_from_sql, timestamp_to_sql,
};
use crate::errors::InfraError;
use crate::storage::pool::get_connection;
use crate::storage::DbPool;

const EVENT_COLUMNS: &str = "id, user_id, source, external_id, title, description, \
     start_time, end_time, all_day, location, attendees, status, etag, sequence, \
     sync_status, sync_error, timezone, metadata, created_at, updated_at";

/// SQLite implementation of the canonical event store.
pub struct SqliteEventRepository {
    pool: Arc<DbPool>,
}

impl SqliteEventRepository {
    /// Create a new event repository.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<CanonicalEvent> {
    Ok(CanonicalEvent {
        id: row.get(0)?,
        user_id: row.get(1)?,
        source: source_from_sql(2, row.get(2)?)?,
        external_id: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        start_time: timestamp_from_sql(6, row.get(6)?)?,
        end_time: timestamp_from_sql(7, row.get(7)?)?,
        all_day: row.get(8)?,
        location: row.get(9)?,
        attendees: string_list_from_sql(10, row.get(10)?)?,
        status: row.get(11)?,
        etag: row.get(12)?,
        sequence: row.get(13)?,
        sync_status: status_from_sql(14, row.get(14)?)?,
        sync_error: row.get(15)?,
        timezone: row.get(16)?,
        metadata: super::row::json_from_sql(17, row.get(17)?)?,
        created_at: timestamp_from_sql(18, row.get(18)?)?,
        updated_at: timestamp_from_sql(19, row.get(19)?)?,
    })
}

fn attendees_to_sql(attendees: &[String]) -> Result<String> {
    serde_json::to_string(attendees).map_err(|e| InfraError::from(e).into())
}

#[async_trait]
impl EventStore for SqliteEventRepository {
    #[instrument(skip(self, event), fields(user_id = %event.user_id))]
    async fn upsert_imported(&self, event: CanonicalEvent) -> Result<()> {
        let conn = get_connection(&self.pool)?;
        let attendees = attendees_to_sql(&event.attendees)?;

        conn.execute(
            "INSERT INTO events (
                id, user_id, source, external_id, title, description,
                start_time, end_time, all_day, location, attendees, status,
                etag, sequence, sync_status, sync_error, timezone, metadata,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
            ON CONFLICT (user_id, source, external_id) WHERE external_id IS NOT NULL
            DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                all_day = excluded.all_day,
                location = excluded.location,
                attendees = excluded.attendees,
                status = excluded.status,
                etag = excluded.etag,
                sequence = excluded.sequence,
                sync_status = excluded.sync_status,
                sync_error = excluded.sync_error,
                timezone = excluded.timezone,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at",
            params![
                event.id,
                event.user_id,
                event.source.as_str(),
                event.external_id,
                event.title,
                event.description,
                timestamp_to_sql(&event.start_time),
                timestamp_to_sql(&event.end_time),
                event.all_day,
                event.location,
                attendees,
                event.status,
                event.etag,
                event.sequence,
                event.sync_status.as_str(),
                event.sync_error,
                event.timezone,
                event.metadata.to_string(),
                timestamp_to_sql(&event.created_at),
                timestamp_to_sql(&event.updated_at),
            ],
        )
        .map_err(InfraError::from)?;

        debug!(external_id = ?event.external_id, "upserted imported event");
        Ok(())
    }

    #[instrument(skip(self, event), fields(user_id = %event.user_id))]
    async fn insert_local(&self, event: CanonicalEvent) -> Result<()> {
        let conn = get_connection(&self.pool)?;
        let attendees = attendees_to_sql(&event.attendees)?;

        conn.execute(
            "INSERT INTO events (
                id, user_id, source, external_id, title, description,
                start_time, end_time, all_day, location, attendees, status,
                etag, sequence, sync_status, sync_error, timezone, metadata,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
            params![
                event.id,
                event.user_id,
                event.source.as_str(),
                event.external_id,
                event.title,
                event.description,
                timestamp_to_sql(&event.start_time),
                timestamp_to_sql(&event.end_time),
                event.all_day,
                event.location,
                attendees,
                event.status,
                event.etag,
                event.sequence,
                event.sync_status.as_str(),
                event.sync_error,
                event.timezone,
                event.metadata.to_string(),
                timestamp_to_sql(&event.created_at),
                timestamp_to_sql(&event.updated_at),
            ],
        )
        .map_err(InfraError::from)?;

        Ok(())
    }

    async fn get(&self, user_id: &str, event_id: &str) -> Result<Option<CanonicalEvent>> {
        let conn = get_connection(&self.pool)?;

        conn.query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE user_id = ?1 AND id = ?2"),
            params![user_id, event_id],
            event_from_row,
        )
        .optional()
        .map_err(|e| InfraError::from(e).into())
    }

    #[instrument(skip(self, event), fields(user_id = %event.user_id, event_id = %event.id))]
    async fn update_local(&self, event: &CanonicalEvent) -> Result<()> {
        let conn = get_connection(&self.pool)?;
        let attendees = attendees_to_sql(&event.attendees)?;

        let updated = conn
            .execute(
                "UPDATE events SET
                    title = ?3, description = ?4, start_time = ?5, end_time = ?6,
                    all_day = ?7, location = ?8, attendees = ?9, timezone = ?10,
                    metadata = ?11, sync_status = ?12, sync_error = ?13, updated_at = ?14
                 WHERE user_id = ?1 AND id = ?2",
                params![
                    event.user_id,
                    event.id,
                    event.title,
                    event.description,
                    timestamp_to_sql(&event.start_time),
                    timestamp_to_sql(&event.end_time),
                    event.all_day,
                    event.location,
                    attendees,
                    event.timezone,
                    event.metadata.to_string(),
                    event.sync_status.as_str(),
                    event.sync_error,
                    timestamp_to_sql(&event.updated_at),
                ],
            )
            .map_err(InfraError::from)?;

        if updated == 0 {
            return Err(DaybridgeError::NotFound(format!("event {}", event.id)));
        }
        Ok(())
    }

    async fn list_pending_exports(&self, user_id: &str) -> Result<Vec<CanonicalEvent>> {
        let conn = get_connection(&self.pool)?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events
                 WHERE user_id = ?1 AND source = 'local'
                   AND sync_status IN ('pending', 'error')
                 ORDER BY created_at ASC"
            ))
            .map_err(InfraError::from)?;

        let events = stmt
            .query_map(params![user_id], event_from_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;

        Ok(events)
    }

    #[instrument(skip(self, outcome), fields(user_id, event_id))]
    async fn record_export_outcome(
        &self,
        user_id: &str,
        event_id: &str,
        outcome: &ExportOutcome,
    ) -> Result<()> {
        let conn = get_connection(&self.pool)?;
        let now = timestamp_to_sql(&Utc::now());

        let updated = match outcome {
            ExportOutcome::Synced { external_id } => conn
                .execute(
                    "UPDATE events SET sync_status = 'synced', external_id = ?3,
                        sync_error = NULL, updated_at = ?4
                     WHERE user_id = ?1 AND id = ?2",
                    params![user_id, event_id, external_id, now],
                )
                .map_err(InfraError::from)?,
            ExportOutcome::Failed { error } => conn
                .execute(
                    "UPDATE events SET sync_status = 'error', sync_error = ?3, updated_at = ?4
                     WHERE user_id = ?1 AND id = ?2",
                    params![user_id, event_id, error, now],
                )
                .map_err(InfraError::from)?,
        };

        if updated == 0 {
            return Err(DaybridgeError::NotFound(format!("event {event_id}")));
        }
        Ok(())
    }

    async fn soft_delete(&self, user_id: &str, event_id: &str) -> Result<()> {
        let conn = get_connection(&self.pool)?;

        let updated = conn
            .execute(
                "UPDATE events SET sync_status = 'deleted', updated_at = ?3
                 WHERE user_id = ?1 AND id = ?2",
                params![user_id, event_id, timestamp_to_sql(&Utc::now())],
            )
            .map_err(InfraError::from)?;

        if updated == 0 {
            return Err(DaybridgeError::NotFound(format!("event {event_id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id))]
    async fn soft_delete_by_source(&self, user_id: &str, source: EventSource) -> Result<()> {
        let conn = get_connection(&self.pool)?;

        let updated = conn
            .execute(
                "UPDATE events SET sync_status = 'deleted', updated_at = ?3
                 WHERE user_id = ?1 AND source = ?2 AND sync_status != 'deleted'",
                params![user_id, source.as_str(), timestamp_to_sql(&Utc::now())],
            )
            .map_err(InfraError::from)?;

        debug!(source = source.as_str(), updated, "soft deleted events by source");
        Ok(())
    }

    async fn list_active(
        &self,
        user_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        sources: Option<&[EventSource]>,
    ) -> Result<Vec<CanonicalEvent>> {
        let conn = get_connection(&self.pool)?;

        let mut sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE user_id = ?1 AND sync_status != 'deleted'"
        );
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

        if let Some(start) = start {
            values.push(Box::new(timestamp_to_sql(&start)));
            sql.push_str(&format!(" AND start_time >= ?{}", values.len()));
        }
        if let Some(end) = end {
            values.push(Box::new(timestamp_to_sql(&end)));
            sql.push_str(&format!(" AND end_time <= ?{}", values.len()));
        }
        if let Some(sources) = sources {
            let mut placeholders = Vec::with_capacity(sources.len());
            for source in sources {
                values.push(Box::new(source.as_str().to_string()));
                placeholders.push(format!("?{}", values.len()));
            }
            sql.push_str(&format!(" AND source IN ({})", placeholders.join(", ")));
        }
        sql.push_str(" ORDER BY start_time ASC");

        let mut stmt = conn.prepare(&sql).map_err(InfraError::from)?;
        let params = values.iter().map(|v| v.as_ref());

        let events = stmt
            .query_map(rusqlite::params_from_iter(params), event_from_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;

        Ok(events)
    }
}
