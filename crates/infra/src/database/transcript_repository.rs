//! SQLite-backed implementation of the TranscriptStore port.

use std::sync::Arc;

use async_trait::async_trait;
use daybridge_core::TranscriptStore;
use daybridge_domain::{Result, Transcript};
use rusqlite::params;
use tracing::{debug, instrument};

use super::row::timestamp_to_sql;
use crate::errors::InfraError;
use crate::storage::pool::get_connection;
use crate::storage::DbPool;

/// SQLite implementation of the transcript store.
pub struct SqliteTranscriptRepository {
    pool: Arc<DbPool>,
}

impl SqliteTranscriptRepository {
    /// Create a new transcript repository.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TranscriptStore for SqliteTranscriptRepository {
    #[instrument(skip(self, transcript), fields(user_id = %transcript.user_id))]
    async fn upsert(&self, transcript: Transcript) -> Result<()> {
        let conn = get_connection(&self.pool)?;

        // The row id and created_at survive re-imports; everything else is
        // replaced by the incoming version.
        conn.execute(
            "INSERT INTO transcripts (
                id, user_id, external_id, title, source, audio_url,
                transcript_text, status, raw_content, processed_at,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT (user_id, external_id) DO UPDATE SET
                title = excluded.title,
                source = excluded.source,
                audio_url = excluded.audio_url,
                transcript_text = excluded.transcript_text,
                status = excluded.status,
                raw_content = excluded.raw_content,
                processed_at = excluded.processed_at,
                updated_at = excluded.updated_at",
            params![
                transcript.id,
                transcript.user_id,
                transcript.external_id,
                transcript.title,
                transcript.source,
                transcript.audio_url,
                transcript.transcript_text,
                transcript.status,
                transcript.raw_content.to_string(),
                timestamp_to_sql(&transcript.processed_at),
                timestamp_to_sql(&transcript.created_at),
                timestamp_to_sql(&transcript.updated_at),
            ],
        )
        .map_err(InfraError::from)?;

        debug!(external_id = %transcript.external_id, "upserted transcript");
        Ok(())
    }

    async fn count_for_user(&self, user_id: &str) -> Result<i64> {
        let conn = get_connection(&self.pool)?;

        conn.query_row(
            "SELECT COUNT(*) FROM transcripts WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| InfraError::from(e).into())
    }
}
