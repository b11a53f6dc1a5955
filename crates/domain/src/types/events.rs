//! Canonical event model and typed event payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin of a canonical event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// Authored locally, exported to the calendar provider.
    Local,
    /// Imported from the calendar provider.
    Calendar,
    /// Derived from a lifelog capture.
    Lifelog,
}

impl EventSource {
    /// Stable string form used in the datastore.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Calendar => "calendar",
            Self::Lifelog => "lifelog",
        }
    }

    /// Parse the datastore string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local" => Some(Self::Local),
            "calendar" => Some(Self::Calendar),
            "lifelog" => Some(Self::Lifelog),
            _ => None,
        }
    }
}

/// Synchronization status of a canonical event row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSyncStatus {
    /// Authored locally, not yet exported.
    Pending,
    Synced,
    /// Last export attempt failed; `sync_error` holds the reason.
    Error,
    /// Soft-deleted. Rows are never physically removed.
    Deleted,
}

impl EventSyncStatus {
    /// Stable string form used in the datastore.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Error => "error",
            Self::Deleted => "deleted",
        }
    }

    /// Parse the datastore string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "synced" => Some(Self::Synced),
            "error" => Some(Self::Error),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// A reconciled event in the canonical store.
///
/// `(user_id, source, external_id)` is unique whenever `external_id` is
/// non-null; upserts key on it so re-importing the same remote event is
/// idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub id: String,
    pub user_id: String,
    pub source: EventSource,
    /// Provider-side identifier. None for locally authored events that have
    /// not been exported yet.
    pub external_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub all_day: bool,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    /// Provider event status (e.g. "confirmed", "cancelled").
    pub status: Option<String>,
    /// Provider optimistic-concurrency markers.
    pub etag: Option<String>,
    pub sequence: i64,
    pub sync_status: EventSyncStatus,
    /// Error text from the last failed export attempt, retained on the row.
    pub sync_error: Option<String>,
    pub timezone: String,
    /// Opaque provider payload kept for audit purposes.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Typed payload for creating or updating a locally authored event.
///
/// Replaces the string-keyed dictionaries the request layer used to pass;
/// validation happens at this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl EventDraft {
    /// Validate the draft before any store or provider work starts.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("event title must not be empty".into());
        }
        if self.start_time >= self.end_time {
            return Err("event start_time must be before end_time".into());
        }
        Ok(())
    }
}

/// A detected cross-source overlap between two canonical events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConflict {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub conflicting_event_id: String,
    pub description: String,
    pub resolved: bool,
    pub resolution: Option<String>,
    pub notes: Option<String>,
    pub detected_at: DateTime<Utc>,
}
