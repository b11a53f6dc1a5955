//! In-memory port implementations shared by the core integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use daybridge_core::{
    CalendarListing, CalendarProvider, ConflictStore, EventPage, EventQuery, EventStore,
    ExportOutcome, LifelogPage, LifelogProvider, OAuthApi, RemoteCalendarEvent, SyncErrorLog,
    SyncStateStore, TokenCipher, TokenStore, TranscriptStore,
};
use daybridge_domain::{
    CanonicalEvent, DaybridgeError, EventDraft, EventSource, EventSyncStatus, LifelogEntry,
    OAuthTokenRecord, Result, SyncConflict, SyncErrorRecord, SyncState, TokenSet, Transcript,
};

// ============================================================================
// Providers
// ============================================================================

/// Lifelog provider fed from scripted pages, one queue per date.
#[derive(Default)]
pub struct ScriptedLifelogProvider {
    pages: Mutex<HashMap<NaiveDate, VecDeque<LifelogPage>>>,
    failing_dates: Mutex<HashSet<NaiveDate>>,
    pub calls: Mutex<Vec<(NaiveDate, Option<String>)>>,
}

impl ScriptedLifelogProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, date: NaiveDate, page: LifelogPage) {
        self.pages.lock().unwrap().entry(date).or_default().push_back(page);
    }

    pub fn fail_date(&self, date: NaiveDate) {
        self.failing_dates.lock().unwrap().insert(date);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn requested_dates(&self) -> Vec<NaiveDate> {
        self.calls.lock().unwrap().iter().map(|(d, _)| *d).collect()
    }
}

#[async_trait]
impl LifelogProvider for ScriptedLifelogProvider {
    async fn list_by_date(
        &self,
        date: NaiveDate,
        _timezone: &str,
        cursor: Option<&str>,
        _limit: Option<u32>,
    ) -> Result<LifelogPage> {
        self.calls.lock().unwrap().push((date, cursor.map(String::from)));

        if self.failing_dates.lock().unwrap().contains(&date) {
            return Err(DaybridgeError::Provider("simulated provider outage".into()));
        }

        let next = self.pages.lock().unwrap().get_mut(&date).and_then(VecDeque::pop_front);
        Ok(next.unwrap_or(LifelogPage {
            entries: Vec::new(),
            next_cursor: None,
            count: 0,
            has_more: false,
        }))
    }
}

/// Calendar provider fed from a scripted page queue, recording every call.
#[derive(Default)]
pub struct MockCalendarProvider {
    pages: Mutex<VecDeque<Result<EventPage>>>,
    pub fetch_queries: Mutex<Vec<EventQuery>>,
    pub created: Mutex<Vec<EventDraft>>,
    pub updated: Mutex<Vec<(String, EventDraft)>>,
    pub deleted: Mutex<Vec<String>>,
    create_error: Mutex<Option<DaybridgeError>>,
    delete_error: Mutex<Option<DaybridgeError>>,
    create_counter: AtomicU32,
}

impl MockCalendarProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, page: EventPage) {
        self.pages.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_fetch_error(&self, err: DaybridgeError) {
        self.pages.lock().unwrap().push_back(Err(err));
    }

    /// Fail the next create/update call with this error.
    pub fn fail_next_create(&self, err: DaybridgeError) {
        *self.create_error.lock().unwrap() = Some(err);
    }

    pub fn fail_next_delete(&self, err: DaybridgeError) {
        *self.delete_error.lock().unwrap() = Some(err);
    }

    fn exported_event(&self, external_id: String, draft: &EventDraft) -> RemoteCalendarEvent {
        RemoteCalendarEvent {
            external_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            start_time: draft.start_time,
            end_time: draft.end_time,
            all_day: draft.all_day,
            location: draft.location.clone(),
            attendees: draft.attendees.clone(),
            status: Some("confirmed".to_string()),
            etag: None,
            sequence: 0,
            metadata: serde_json::Value::Null,
        }
    }
}

#[async_trait]
impl CalendarProvider for MockCalendarProvider {
    async fn list_calendars(&self, _access_token: &str) -> Result<Vec<CalendarListing>> {
        Ok(vec![CalendarListing {
            id: "primary".to_string(),
            summary: "Primary".to_string(),
            primary: true,
        }])
    }

    async fn fetch_events(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        query: &EventQuery,
    ) -> Result<EventPage> {
        self.fetch_queries.lock().unwrap().push(query.clone());

        match self.pages.lock().unwrap().pop_front() {
            Some(result) => result,
            None => {
                Ok(EventPage { events: Vec::new(), next_sync_token: None, next_page_token: None })
            }
        }
    }

    async fn create_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        draft: &EventDraft,
    ) -> Result<RemoteCalendarEvent> {
        if let Some(err) = self.create_error.lock().unwrap().take() {
            return Err(err);
        }

        self.created.lock().unwrap().push(draft.clone());
        let n = self.create_counter.fetch_add(1, Ordering::SeqCst);
        Ok(self.exported_event(format!("remote-{n}"), draft))
    }

    async fn update_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        external_id: &str,
        draft: &EventDraft,
    ) -> Result<RemoteCalendarEvent> {
        if let Some(err) = self.create_error.lock().unwrap().take() {
            return Err(err);
        }

        self.updated.lock().unwrap().push((external_id.to_string(), draft.clone()));
        Ok(self.exported_event(external_id.to_string(), draft))
    }

    async fn delete_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        external_id: &str,
    ) -> Result<()> {
        if let Some(err) = self.delete_error.lock().unwrap().take() {
            return Err(err);
        }

        self.deleted.lock().unwrap().push(external_id.to_string());
        Ok(())
    }
}

/// OAuth API mock with switchable failure modes.
#[derive(Default)]
pub struct MockOAuthApi {
    pub refresh_calls: AtomicU32,
    pub revoke_calls: AtomicU32,
    pub fail_refresh: AtomicBool,
    pub fail_revoke: AtomicBool,
}

impl MockOAuthApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh_count(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn revoke_count(&self) -> u32 {
        self.revoke_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthApi for MockOAuthApi {
    async fn exchange_code(&self, _code: &str) -> Result<TokenSet> {
        Ok(TokenSet {
            access_token: "access-initial".to_string(),
            refresh_token: Some("refresh-initial".to_string()),
            token_type: "Bearer".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            scope: Some("calendar".to_string()),
        })
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenSet> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(DaybridgeError::Auth("refresh rejected".into()));
        }

        Ok(TokenSet {
            access_token: "access-refreshed".to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            scope: None,
        })
    }

    async fn revoke_token(&self, _access_token: &str) -> Result<()> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(DaybridgeError::Provider("revocation endpoint unreachable".into()));
        }
        Ok(())
    }
}

/// Reversible cipher for tests; marks ciphertext so accidental plaintext
/// storage shows up in assertions.
pub struct ReversibleCipher;

impl TokenCipher for ReversibleCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(format!("enc({plaintext})"))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        ciphertext
            .strip_prefix("enc(")
            .and_then(|rest| rest.strip_suffix(')'))
            .map(String::from)
            .ok_or_else(|| DaybridgeError::Internal("not a test ciphertext".into()))
    }
}

// ============================================================================
// Stores
// ============================================================================

#[derive(Default)]
pub struct InMemoryTranscriptStore {
    rows: Mutex<HashMap<(String, String), Transcript>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &str, external_id: &str) -> Option<Transcript> {
        self.rows.lock().unwrap().get(&(user_id.to_string(), external_id.to_string())).cloned()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn upsert(&self, transcript: Transcript) -> Result<()> {
        let key = (transcript.user_id.clone(), transcript.external_id.clone());
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&key) {
            Some(existing) => {
                // Keep the original row id on re-import.
                let id = existing.id.clone();
                *existing = Transcript { id, ..transcript };
            }
            None => {
                rows.insert(key, transcript);
            }
        }
        Ok(())
    }

    async fn count_for_user(&self, user_id: &str) -> Result<i64> {
        Ok(self.rows.lock().unwrap().keys().filter(|(u, _)| u == user_id).count() as i64)
    }
}

#[derive(Default)]
pub struct InMemorySyncStateStore {
    rows: Mutex<HashMap<(String, String), SyncState>>,
}

impl InMemorySyncStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, user_id: &str, provider: &str) -> Option<SyncState> {
        self.rows.lock().unwrap().get(&(user_id.to_string(), provider.to_string())).cloned()
    }
}

#[async_trait]
impl SyncStateStore for InMemorySyncStateStore {
    async fn get(&self, user_id: &str, provider: &str) -> Result<Option<SyncState>> {
        Ok(self.snapshot(user_id, provider))
    }

    async fn upsert(&self, state: &SyncState) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .insert((state.user_id.clone(), state.provider.clone()), state.clone());
        Ok(())
    }

    async fn delete(&self, user_id: &str, provider: &str) -> Result<()> {
        self.rows.lock().unwrap().remove(&(user_id.to_string(), provider.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTokenStore {
    rows: Mutex<HashMap<(String, String), OAuthTokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, user_id: &str, provider: &str) -> Option<OAuthTokenRecord> {
        self.rows.lock().unwrap().get(&(user_id.to_string(), provider.to_string())).cloned()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, user_id: &str, provider: &str) -> Result<Option<OAuthTokenRecord>> {
        Ok(self.snapshot(user_id, provider))
    }

    async fn upsert(&self, record: &OAuthTokenRecord) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .insert((record.user_id.clone(), record.provider.clone()), record.clone());
        Ok(())
    }

    async fn delete(&self, user_id: &str, provider: &str) -> Result<()> {
        self.rows.lock().unwrap().remove(&(user_id.to_string(), provider.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryEventStore {
    rows: Mutex<Vec<CanonicalEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<CanonicalEvent> {
        self.rows.lock().unwrap().clone()
    }

    pub fn by_id(&self, event_id: &str) -> Option<CanonicalEvent> {
        self.rows.lock().unwrap().iter().find(|e| e.id == event_id).cloned()
    }

    pub fn seed(&self, event: CanonicalEvent) {
        self.rows.lock().unwrap().push(event);
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn upsert_imported(&self, event: CanonicalEvent) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let existing = rows.iter_mut().find(|e| {
            e.user_id == event.user_id
                && e.source == event.source
                && e.external_id.is_some()
                && e.external_id == event.external_id
        });

        match existing {
            Some(row) => {
                let id = row.id.clone();
                let created_at = row.created_at;
                *row = CanonicalEvent { id, created_at, ..event };
            }
            None => rows.push(event),
        }
        Ok(())
    }

    async fn insert_local(&self, event: CanonicalEvent) -> Result<()> {
        self.rows.lock().unwrap().push(event);
        Ok(())
    }

    async fn get(&self, user_id: &str, event_id: &str) -> Result<Option<CanonicalEvent>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.user_id == user_id && e.id == event_id)
            .cloned())
    }

    async fn update_local(&self, event: &CanonicalEvent) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|e| e.user_id == event.user_id && e.id == event.id) {
            Some(row) => {
                *row = event.clone();
                Ok(())
            }
            None => Err(DaybridgeError::NotFound(format!("event {}", event.id))),
        }
    }

    async fn list_pending_exports(&self, user_id: &str) -> Result<Vec<CanonicalEvent>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.user_id == user_id
                    && e.source == EventSource::Local
                    && matches!(e.sync_status, EventSyncStatus::Pending | EventSyncStatus::Error)
            })
            .cloned()
            .collect())
    }

    async fn record_export_outcome(
        &self,
        user_id: &str,
        event_id: &str,
        outcome: &ExportOutcome,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|e| e.user_id == user_id && e.id == event_id) else {
            return Err(DaybridgeError::NotFound(format!("event {event_id}")));
        };

        match outcome {
            ExportOutcome::Synced { external_id } => {
                row.sync_status = EventSyncStatus::Synced;
                row.external_id = Some(external_id.clone());
                row.sync_error = None;
            }
            ExportOutcome::Failed { error } => {
                row.sync_status = EventSyncStatus::Error;
                row.sync_error = Some(error.clone());
            }
        }
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn soft_delete(&self, user_id: &str, event_id: &str) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|e| e.user_id == user_id && e.id == event_id) {
            Some(row) => {
                row.sync_status = EventSyncStatus::Deleted;
                row.updated_at = Utc::now();
                Ok(())
            }
            None => Err(DaybridgeError::NotFound(format!("event {event_id}"))),
        }
    }

    async fn soft_delete_by_source(&self, user_id: &str, source: EventSource) -> Result<()> {
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.user_id == user_id && row.source == source {
                row.sync_status = EventSyncStatus::Deleted;
                row.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn list_active(
        &self,
        user_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        sources: Option<&[EventSource]>,
    ) -> Result<Vec<CanonicalEvent>> {
        let mut events: Vec<CanonicalEvent> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id && e.sync_status != EventSyncStatus::Deleted)
            .filter(|e| start.map_or(true, |s| e.start_time >= s))
            .filter(|e| end.map_or(true, |x| e.end_time <= x))
            .filter(|e| sources.map_or(true, |list| list.contains(&e.source)))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start_time);
        Ok(events)
    }
}

#[derive(Default)]
pub struct InMemoryConflictStore {
    rows: Mutex<Vec<SyncConflict>>,
}

impl InMemoryConflictStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<SyncConflict> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConflictStore for InMemoryConflictStore {
    async fn upsert(&self, conflict: &SyncConflict) -> Result<SyncConflict> {
        let mut rows = self.rows.lock().unwrap();
        let existing = rows.iter_mut().find(|c| {
            c.user_id == conflict.user_id
                && c.event_id == conflict.event_id
                && c.conflicting_event_id == conflict.conflicting_event_id
        });

        // The stored row wins: an existing pair keeps its id and any
        // resolution, taking only the refreshed description and timestamp.
        match existing {
            Some(row) => {
                row.description = conflict.description.clone();
                row.detected_at = conflict.detected_at;
                Ok(row.clone())
            }
            None => {
                rows.push(conflict.clone());
                Ok(conflict.clone())
            }
        }
    }

    async fn list_unresolved(&self, user_id: &str) -> Result<Vec<SyncConflict>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id && !c.resolved)
            .cloned()
            .collect())
    }

    async fn resolve(
        &self,
        user_id: &str,
        conflict_id: &str,
        resolution: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|c| c.user_id == user_id && c.id == conflict_id) {
            Some(row) => {
                row.resolved = true;
                row.resolution = Some(resolution.to_string());
                row.notes = notes.map(String::from);
                Ok(())
            }
            None => Err(DaybridgeError::NotFound(format!("conflict {conflict_id}"))),
        }
    }
}

#[derive(Default)]
pub struct RecordingErrorLog {
    rows: Mutex<Vec<SyncErrorRecord>>,
}

impl RecordingErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<SyncErrorRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl SyncErrorLog for RecordingErrorLog {
    async fn append(&self, record: &SyncErrorRecord) -> Result<()> {
        self.rows.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn lifelog_entry(id: &str, title: &str) -> LifelogEntry {
    LifelogEntry {
        id: id.to_string(),
        title: title.to_string(),
        content: format!("{title} content"),
        markdown: format!("# {title}"),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        audio_url: None,
        transcript_text: Some(format!("{title} transcript")),
    }
}

pub fn lifelog_page(
    entries: Vec<LifelogEntry>,
    next_cursor: Option<&str>,
    has_more: bool,
) -> LifelogPage {
    let count = entries.len() as i64;
    LifelogPage { entries, next_cursor: next_cursor.map(String::from), count, has_more }
}

pub fn remote_event(
    external_id: &str,
    title: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> RemoteCalendarEvent {
    RemoteCalendarEvent {
        external_id: external_id.to_string(),
        title: title.to_string(),
        description: None,
        start_time: start,
        end_time: end,
        all_day: false,
        location: None,
        attendees: Vec::new(),
        status: Some("confirmed".to_string()),
        etag: Some(format!("etag-{external_id}")),
        sequence: 0,
        metadata: serde_json::Value::Null,
    }
}

pub fn canonical_event(
    user_id: &str,
    id: &str,
    source: EventSource,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> CanonicalEvent {
    CanonicalEvent {
        id: id.to_string(),
        user_id: user_id.to_string(),
        source,
        external_id: Some(format!("ext-{id}")),
        title: format!("event {id}"),
        description: None,
        start_time: start,
        end_time: end,
        all_day: false,
        location: None,
        attendees: Vec::new(),
        status: Some("confirmed".to_string()),
        etag: None,
        sequence: 0,
        sync_status: EventSyncStatus::Synced,
        sync_error: None,
        timezone: "UTC".to_string(),
        metadata: serde_json::Value::Null,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn draft(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> EventDraft {
    EventDraft {
        title: title.to_string(),
        description: None,
        start_time: start,
        end_time: end,
        all_day: false,
        location: None,
        attendees: Vec::new(),
        timezone: "UTC".to_string(),
        metadata: serde_json::Value::Null,
    }
}

/// Stored token record whose access token expires at `expires_at`.
pub fn token_record(user_id: &str, expires_at: DateTime<Utc>, with_refresh: bool) -> OAuthTokenRecord {
    OAuthTokenRecord {
        user_id: user_id.to_string(),
        provider: "calendar".to_string(),
        access_token_encrypted: "enc(access-stored)".to_string(),
        refresh_token_encrypted: with_refresh.then(|| "enc(refresh-stored)".to_string()),
        token_type: "Bearer".to_string(),
        expires_at,
        scope: Some("calendar".to_string()),
        updated_at: Utc::now(),
    }
}

/// Assemble an `Arc` bundle for engines that need the full store set.
pub struct CoreHarness {
    pub lifelog_provider: Arc<ScriptedLifelogProvider>,
    pub calendar_provider: Arc<MockCalendarProvider>,
    pub oauth: Arc<MockOAuthApi>,
    pub transcripts: Arc<InMemoryTranscriptStore>,
    pub events: Arc<InMemoryEventStore>,
    pub sync_state: Arc<InMemorySyncStateStore>,
    pub token_store: Arc<InMemoryTokenStore>,
    pub conflicts: Arc<InMemoryConflictStore>,
    pub error_log: Arc<RecordingErrorLog>,
}

impl CoreHarness {
    pub fn new() -> Self {
        Self {
            lifelog_provider: Arc::new(ScriptedLifelogProvider::new()),
            calendar_provider: Arc::new(MockCalendarProvider::new()),
            oauth: Arc::new(MockOAuthApi::new()),
            transcripts: Arc::new(InMemoryTranscriptStore::new()),
            events: Arc::new(InMemoryEventStore::new()),
            sync_state: Arc::new(InMemorySyncStateStore::new()),
            token_store: Arc::new(InMemoryTokenStore::new()),
            conflicts: Arc::new(InMemoryConflictStore::new()),
            error_log: Arc::new(RecordingErrorLog::new()),
        }
    }
}
