//! Lifelog capture records and derived transcripts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single lifelog entry as returned by the capture provider.
///
/// Lifelog content arrives pre-transcribed; `transcript_text` is already
/// populated from the markdown/content body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifelogEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    pub markdown: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub audio_url: Option<String>,
    pub transcript_text: Option<String>,
}

/// Transcript derived from a lifelog entry; unique per `(user, external_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub user_id: String,
    /// Lifelog entry id on the provider side.
    pub external_id: String,
    pub title: String,
    pub source: String,
    pub audio_url: Option<String>,
    pub transcript_text: Option<String>,
    /// Fixed to "completed" on creation: lifelog content is pre-transcribed.
    pub status: String,
    /// Original provider payload kept verbatim.
    pub raw_content: serde_json::Value,
    pub processed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
