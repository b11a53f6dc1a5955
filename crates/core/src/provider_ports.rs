//! Provider-facing port interfaces
//!
//! Adapters implementing these traits translate each remote API's
//! paging/token idiom into one uniform page-result shape. A page request is
//! a pure read: adapters perform no retries themselves, retry policy belongs
//! to the calling engine.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use daybridge_domain::{EventDraft, LifelogEntry, Result, TokenSet};
use serde::{Deserialize, Serialize};

/// One page of lifelog entries for a single date.
#[derive(Debug, Clone)]
pub struct LifelogPage {
    pub entries: Vec<LifelogEntry>,
    /// Opaque cursor to replay for the next page of the same date query.
    pub next_cursor: Option<String>,
    /// Provider's estimate of items for the query.
    pub count: i64,
    pub has_more: bool,
}

/// Port for the lifelog capture provider.
#[async_trait]
pub trait LifelogProvider: Send + Sync {
    /// List lifelogs for one date, optionally resuming at `cursor`.
    async fn list_by_date(
        &self,
        date: NaiveDate,
        timezone: &str,
        cursor: Option<&str>,
        limit: Option<u32>,
    ) -> Result<LifelogPage>;
}

/// Calendar event as returned by the provider, already parsed out of the
/// wire format but not yet reconciled into the canonical store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCalendarEvent {
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub all_day: bool,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    /// Provider status, e.g. "confirmed" or "cancelled".
    pub status: Option<String>,
    pub etag: Option<String>,
    pub sequence: i64,
    /// Original payload retained as opaque metadata.
    pub metadata: serde_json::Value,
}

/// Query parameters for one calendar page fetch.
///
/// `sync_token` and the time window are mutually exclusive: an incremental
/// pull replays the provider-issued token, a full pull bounds the window.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub sync_token: Option<String>,
    pub time_min: Option<DateTime<Utc>>,
    pub time_max: Option<DateTime<Utc>>,
    pub page_token: Option<String>,
}

/// One page of calendar events.
#[derive(Debug, Clone)]
pub struct EventPage {
    pub events: Vec<RemoteCalendarEvent>,
    /// Issued on the final page of a pull; replaces the stored token.
    pub next_sync_token: Option<String>,
    /// Present while more pages remain for the current pull.
    pub next_page_token: Option<String>,
}

/// A calendar in the user's calendar list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarListing {
    pub id: String,
    pub summary: String,
    pub primary: bool,
}

/// Port for the calendar provider.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// List the user's calendars.
    async fn list_calendars(&self, access_token: &str) -> Result<Vec<CalendarListing>>;

    /// Fetch one page of events.
    async fn fetch_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        query: &EventQuery,
    ) -> Result<EventPage>;

    /// Create a remote event from a local draft.
    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        draft: &EventDraft,
    ) -> Result<RemoteCalendarEvent>;

    /// Update an existing remote event.
    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        external_id: &str,
        draft: &EventDraft,
    ) -> Result<RemoteCalendarEvent>;

    /// Delete a remote event. An already-gone target surfaces as
    /// [`daybridge_domain::DaybridgeError::Conflict`]; the engine treats
    /// that as success.
    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        external_id: &str,
    ) -> Result<()>;
}

/// Port for the calendar provider's OAuth endpoints.
#[async_trait]
pub trait OAuthApi: Send + Sync {
    /// Exchange an authorization code for a token pair.
    async fn exchange_code(&self, code: &str) -> Result<TokenSet>;

    /// Obtain a fresh access token from a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet>;

    /// Revoke an access token. Best-effort on the caller's side.
    async fn revoke_token(&self, access_token: &str) -> Result<()>;
}

/// Opaque credential encryption capability.
///
/// The primitives behind this are out of scope; production wiring injects
/// whatever the deployment uses for secrets at rest.
pub trait TokenCipher: Send + Sync {
    /// Encrypt a token for storage.
    fn encrypt(&self, plaintext: &str) -> Result<String>;

    /// Decrypt a stored token.
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}
