//! Sync state, run reports, and progress messages

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Provider identifiers used in sync state and error log rows.
pub mod provider {
    /// The lifelog capture provider.
    pub const LIFELOG: &str = "lifelog";
    /// The calendar provider.
    pub const CALENDAR: &str = "calendar";
}

/// Per-(user, provider) synchronization bookmark.
///
/// Created on first connect and mutated after every successful unit of work:
/// one date for the lifelog engine, one full pass for the calendar engine.
/// Never deleted while the connection exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub user_id: String,
    pub provider: String,
    /// Day-granularity bookmark (lifelog). The last *completed* date; a
    /// crash mid-range resumes here, re-processing is safe because upserts
    /// are idempotent.
    pub last_sync_date: Option<NaiveDate>,
    /// Opaque incremental token (calendar).
    pub next_sync_token: Option<String>,
    /// Provider calendar the sync is bound to (calendar only).
    pub calendar_id: Option<String>,
    pub last_cursor: Option<String>,
    /// Monotonically increasing count of lifelog records synced.
    pub total_synced: i64,
    pub events_imported: i64,
    pub events_exported: i64,
    pub conflicts_detected: i64,
    pub full_sync_completed: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_successful_sync_at: Option<DateTime<Utc>>,
    pub error_count: i64,
}

impl SyncState {
    /// Fresh state for a newly connected provider.
    pub fn new(user_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            provider: provider.into(),
            last_sync_date: None,
            next_sync_token: None,
            calendar_id: None,
            last_cursor: None,
            total_synced: 0,
            events_imported: 0,
            events_exported: 0,
            conflicts_detected: 0,
            full_sync_completed: false,
            last_sync_at: None,
            last_successful_sync_at: None,
            error_count: 0,
        }
    }
}

/// Append-only sync error log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncErrorRecord {
    pub user_id: String,
    pub provider: String,
    pub message: String,
    pub details: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

/// Result of a lifelog sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifelogSyncReport {
    pub total_synced: i64,
    pub last_sync_date: NaiveDate,
    pub errors: Vec<String>,
}

/// Result of a calendar sync run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarSyncReport {
    pub imported: i64,
    pub exported: i64,
    pub errors: Vec<String>,
    pub conflicts: Vec<String>,
}

/// Availability snapshot for one lifelog date, without syncing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStats {
    pub date: NaiveDate,
    pub has_data: bool,
    pub estimated_count: i64,
    pub has_more_pages: bool,
}

/// Best-effort progress message pushed to callers during a sync run.
///
/// Delivery failures never affect the sync outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncProgress {
    BatchProcessed {
        date: NaiveDate,
        batch_size: usize,
        batch_synced: i64,
        has_more: bool,
    },
    DateCompleted {
        date: NaiveDate,
        synced_count: i64,
        total_synced: i64,
    },
    DateFailed {
        date: NaiveDate,
        error: String,
    },
    RunCompleted {
        total_synced: i64,
    },
}
