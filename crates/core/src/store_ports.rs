//! Canonical store port interfaces
//!
//! All writes are idempotent upserts keyed by the natural uniqueness
//! constraints from the data model; deletes are soft (status flips, never
//! row removal).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use daybridge_domain::{
    CanonicalEvent, EventSource, OAuthTokenRecord, Result, SyncConflict, SyncErrorRecord,
    SyncState, Transcript,
};

/// Result of one export attempt, recorded on the event row.
#[derive(Debug, Clone)]
pub enum ExportOutcome {
    /// Export succeeded; the provider assigned (or confirmed) this id.
    Synced { external_id: String },
    /// Export failed; the error text is retained on the row so the next
    /// sync run re-attempts it.
    Failed { error: String },
}

/// Port for the canonical event table.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert-or-update keyed by `(user_id, source, external_id)`. The
    /// incoming (remote) version overwrites local edits.
    async fn upsert_imported(&self, event: CanonicalEvent) -> Result<()>;

    /// Insert a locally authored event (no external id yet).
    async fn insert_local(&self, event: CanonicalEvent) -> Result<()>;

    /// Fetch one event by local id, scoped to the user.
    async fn get(&self, user_id: &str, event_id: &str) -> Result<Option<CanonicalEvent>>;

    /// Replace the mutable fields of a locally authored event and flip it
    /// back to pending.
    async fn update_local(&self, event: &CanonicalEvent) -> Result<()>;

    /// Locally authored events awaiting export (`pending` or `error`).
    async fn list_pending_exports(&self, user_id: &str) -> Result<Vec<CanonicalEvent>>;

    /// Record the outcome of an export attempt.
    async fn record_export_outcome(
        &self,
        user_id: &str,
        event_id: &str,
        outcome: &ExportOutcome,
    ) -> Result<()>;

    /// Soft delete one event.
    async fn soft_delete(&self, user_id: &str, event_id: &str) -> Result<()>;

    /// Soft delete every event from a source (used on disconnect).
    async fn soft_delete_by_source(&self, user_id: &str, source: EventSource) -> Result<()>;

    /// All non-deleted events for a user, optionally bounded in time and
    /// filtered by source, ordered by start time.
    async fn list_active(
        &self,
        user_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        sources: Option<&[EventSource]>,
    ) -> Result<Vec<CanonicalEvent>>;
}

/// Port for the transcript table; rows are unique per `(user, external_id)`.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Insert-or-update a transcript derived from a lifelog entry.
    async fn upsert(&self, transcript: Transcript) -> Result<()>;

    /// Count transcripts for a user (test/stats surface).
    async fn count_for_user(&self, user_id: &str) -> Result<i64>;
}

/// Port for the per-(user, provider) sync bookmark.
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    async fn get(&self, user_id: &str, provider: &str) -> Result<Option<SyncState>>;

    /// Insert-or-replace keyed by `(user_id, provider)`.
    async fn upsert(&self, state: &SyncState) -> Result<()>;

    /// Remove the bookmark entirely (disconnect).
    async fn delete(&self, user_id: &str, provider: &str) -> Result<()>;
}

/// Port for encrypted OAuth token rows; one live record per
/// `(user, provider)`.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, user_id: &str, provider: &str) -> Result<Option<OAuthTokenRecord>>;

    /// Insert-or-replace keyed by `(user_id, provider)`.
    async fn upsert(&self, record: &OAuthTokenRecord) -> Result<()>;

    async fn delete(&self, user_id: &str, provider: &str) -> Result<()>;
}

/// Port for detected conflicts. Conflicts are never auto-deleted; only an
/// explicit resolve action mutates them.
#[async_trait]
pub trait ConflictStore: Send + Sync {
    /// Insert-or-update keyed by the (ordered) event id pair. Returns the
    /// stored row: a re-detected pair keeps its original id and any
    /// resolution, not the caller's fresh values.
    async fn upsert(&self, conflict: &SyncConflict) -> Result<SyncConflict>;

    async fn list_unresolved(&self, user_id: &str) -> Result<Vec<SyncConflict>>;

    /// Mark a conflict resolved with the caller's resolution text.
    async fn resolve(
        &self,
        user_id: &str,
        conflict_id: &str,
        resolution: &str,
        notes: Option<&str>,
    ) -> Result<()>;
}

/// Append-only sync error log.
#[async_trait]
pub trait SyncErrorLog: Send + Sync {
    async fn append(&self, record: &SyncErrorRecord) -> Result<()>;
}
