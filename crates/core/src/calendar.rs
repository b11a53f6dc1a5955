//! Calendar sync engine
//!
//! Bidirectional importer/exporter for the calendar provider. Imports use
//! provider sync tokens for incremental pulls and a bounded time window for
//! full pulls; exports push locally authored events out as create/update/
//! delete calls. The remote side is authoritative for imported events, the
//! local side for exported ones.

use std::sync::Arc;

use chrono::{Duration, Utc};
use daybridge_domain::{
    provider, CalendarSyncReport, CanonicalEvent, DaybridgeError, EventDraft, EventSource,
    EventSyncStatus, Result, SyncErrorRecord, SyncState,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::conflicts::ConflictDetector;
use crate::provider_ports::{CalendarProvider, EventQuery, RemoteCalendarEvent};
use crate::store_ports::{EventStore, ExportOutcome, SyncErrorLog, SyncStateStore};
use crate::tokens::TokenLifecycleManager;

/// Full pulls are bounded to `[now - 30d, now + 90d]`.
const FULL_SYNC_LOOKBACK_DAYS: i64 = 30;
const FULL_SYNC_LOOKAHEAD_DAYS: i64 = 90;

const DEFAULT_CALENDAR_ID: &str = "primary";

/// Bidirectional calendar importer/exporter.
pub struct CalendarSyncEngine {
    provider: Arc<dyn CalendarProvider>,
    tokens: Arc<TokenLifecycleManager>,
    events: Arc<dyn EventStore>,
    sync_state: Arc<dyn SyncStateStore>,
    error_log: Arc<dyn SyncErrorLog>,
    detector: ConflictDetector,
}

impl CalendarSyncEngine {
    /// Create a new engine instance.
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        tokens: Arc<TokenLifecycleManager>,
        events: Arc<dyn EventStore>,
        sync_state: Arc<dyn SyncStateStore>,
        error_log: Arc<dyn SyncErrorLog>,
        detector: ConflictDetector,
    ) -> Self {
        Self { provider, tokens, events, sync_state, error_log, detector }
    }

    /// Connect the calendar provider: exchange the authorization code,
    /// bind the sync state to the user's primary calendar, and run an
    /// initial sync.
    #[instrument(skip(self, auth_code), fields(user_id))]
    pub async fn connect(&self, user_id: &str, auth_code: &str) -> Result<CalendarSyncReport> {
        let token_set = self.tokens.connect(user_id, auth_code).await?;

        let calendars = self.provider.list_calendars(&token_set.access_token).await?;
        let calendar_id = calendars
            .iter()
            .find(|c| c.primary)
            .or_else(|| calendars.first())
            .map(|c| c.id.clone())
            .unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string());

        let mut state = self
            .sync_state
            .get(user_id, provider::CALENDAR)
            .await?
            .unwrap_or_else(|| SyncState::new(user_id, provider::CALENDAR));
        state.calendar_id = Some(calendar_id);
        self.sync_state.upsert(&state).await?;

        info!(user_id, "calendar connected, running initial sync");
        self.sync_user_calendar(user_id, false).await
    }

    /// Disconnect the provider: revoke and delete credentials and sync
    /// state, then soft delete the imported events to preserve history.
    #[instrument(skip(self), fields(user_id))]
    pub async fn disconnect(&self, user_id: &str) -> Result<()> {
        self.tokens.disconnect(user_id).await?;
        self.events.soft_delete_by_source(user_id, EventSource::Calendar).await?;
        Ok(())
    }

    /// Run one full sync pass: import remote changes, export pending local
    /// events, then scan for cross-source conflicts. Sub-flow failures are
    /// collected into the report; they never abort the run.
    #[instrument(skip(self), fields(user_id, force_full_sync))]
    pub async fn sync_user_calendar(
        &self,
        user_id: &str,
        force_full_sync: bool,
    ) -> Result<CalendarSyncReport> {
        info!(user_id, force_full_sync, "starting calendar sync");
        let mut report = CalendarSyncReport::default();

        let Some(mut state) = self.sync_state.get(user_id, provider::CALENDAR).await? else {
            report.errors.push("calendar is not connected".to_string());
            return Ok(report);
        };

        let access_token = match self.tokens.access_token(user_id).await {
            Ok(token) => Some(token),
            Err(DaybridgeError::NoValidToken(_)) => {
                report.errors.push("no valid calendar token".to_string());
                None
            }
            Err(err) => return Err(err),
        };

        if let Some(ref token) = access_token {
            if let Err(err) = self.import(user_id, token, &mut state, force_full_sync, &mut report).await
            {
                self.log_error(user_id, &format!("calendar import failed: {err}")).await;
                report.errors.push(err.to_string());
                state.error_count += 1;
            }

            self.export(user_id, token, &state, &mut report).await;
        }

        let conflicts = self.detector.detect(user_id).await?;
        report.conflicts = conflicts.into_iter().map(|c| c.id).collect();

        state.events_imported += report.imported;
        state.events_exported += report.exported;
        state.conflicts_detected += report.conflicts.len() as i64;
        state.last_sync_at = Some(Utc::now());
        self.sync_state.upsert(&state).await?;

        info!(
            user_id,
            imported = report.imported,
            exported = report.exported,
            conflicts = report.conflicts.len(),
            "calendar sync completed"
        );
        Ok(report)
    }

    /// Create a locally authored event and export it immediately. A failed
    /// export leaves the row `pending`/`error`; the next sync re-attempts
    /// it.
    #[instrument(skip(self, draft), fields(user_id))]
    pub async fn create_event(&self, user_id: &str, draft: EventDraft) -> Result<String> {
        draft.validate().map_err(DaybridgeError::InvalidInput)?;

        let now = Utc::now();
        let event = CanonicalEvent {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            source: EventSource::Local,
            external_id: None,
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
            sync_status: EventSyncStatus::Pending,
            sync_error: None,
            timezone: draft.timezone.clone(),
            metadata: draft.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        let event_id = event.id.clone();
        self.events.insert_local(event).await?;

        self.export_one(user_id, &event_id, &draft, None).await;
        Ok(event_id)
    }

    /// Update a locally authored event and push the change out when it was
    /// previously exported. Imported events are only updated locally; the
    /// remote copy is authoritative and will overwrite on the next import.
    #[instrument(skip(self, draft), fields(user_id, event_id))]
    pub async fn update_event(
        &self,
        user_id: &str,
        event_id: &str,
        draft: EventDraft,
    ) -> Result<()> {
        draft.validate().map_err(DaybridgeError::InvalidInput)?;

        let Some(mut event) = self.events.get(user_id, event_id).await? else {
            return Err(DaybridgeError::NotFound(format!("event {event_id}")));
        };

        event.title = draft.title.clone();
        event.description = draft.description.clone();
        event.start_time = draft.start_time;
        event.end_time = draft.end_time;
        event.all_day = draft.all_day;
        event.location = draft.location.clone();
        event.attendees = draft.attendees.clone();
        event.timezone = draft.timezone.clone();
        event.metadata = draft.metadata.clone();
        event.sync_status = EventSyncStatus::Pending;
        event.updated_at = Utc::now();
        self.events.update_local(&event).await?;

        if event.source == EventSource::Local {
            let external_id = event.external_id.clone();
            self.export_one(user_id, event_id, &draft, external_id.as_deref()).await;
        }

        Ok(())
    }

    /// Soft delete an event. A locally authored, previously exported event
    /// is deleted remotely first; deleting an imported event leaves the
    /// remote copy untouched. A remote "already gone" answer counts as
    /// success.
    #[instrument(skip(self), fields(user_id, event_id))]
    pub async fn delete_event(&self, user_id: &str, event_id: &str) -> Result<()> {
        let Some(event) = self.events.get(user_id, event_id).await? else {
            return Err(DaybridgeError::NotFound(format!("event {event_id}")));
        };

        if event.source == EventSource::Local {
            if let Some(external_id) = event.external_id.as_deref() {
                match self.remote_delete(user_id, external_id).await {
                    Ok(()) => {}
                    Err(err) => {
                        // The local soft delete proceeds regardless; the row
                        // keeps its audit history either way.
                        warn!(user_id, event_id, error = %err, "remote delete failed");
                        self.log_error(user_id, &format!("remote delete failed: {err}")).await;
                    }
                }
            }
        }

        self.events.soft_delete(user_id, event_id).await
    }

    /// Non-deleted events for a user, optionally bounded and filtered.
    pub async fn get_user_events(
        &self,
        user_id: &str,
        start: Option<chrono::DateTime<Utc>>,
        end: Option<chrono::DateTime<Utc>>,
        sources: Option<&[EventSource]>,
    ) -> Result<Vec<CanonicalEvent>> {
        self.events.list_active(user_id, start, end, sources).await
    }

    /// Import sub-flow: incremental when a sync token exists, otherwise a
    /// bounded full pull. Follows page tokens until the provider stops
    /// issuing them, then swaps in the new sync token.
    async fn import(
        &self,
        user_id: &str,
        access_token: &str,
        state: &mut SyncState,
        force_full_sync: bool,
        report: &mut CalendarSyncReport,
    ) -> Result<()> {
        let calendar_id =
            state.calendar_id.clone().unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string());

        let sync_token = if force_full_sync { None } else { state.next_sync_token.clone() };
        let mut query = match sync_token {
            Some(token) => EventQuery { sync_token: Some(token), ..EventQuery::default() },
            None => {
                let now = Utc::now();
                EventQuery {
                    time_min: Some(now - Duration::days(FULL_SYNC_LOOKBACK_DAYS)),
                    time_max: Some(now + Duration::days(FULL_SYNC_LOOKAHEAD_DAYS)),
                    ..EventQuery::default()
                }
            }
        };

        let mut imported = 0i64;
        let mut latest_sync_token: Option<String> = None;

        loop {
            let page = match self.provider.fetch_events(access_token, &calendar_id, &query).await {
                Ok(page) => page,
                Err(err) => {
                    if err.is_sync_token_gone() {
                        warn!(user_id, "sync token invalid (410 GONE), clearing for retry");
                        state.next_sync_token = None;
                        self.sync_state.upsert(state).await?;
                    }
                    return Err(err);
                }
            };

            latest_sync_token = page.next_sync_token.or(latest_sync_token);
            query.page_token = page.next_page_token;

            for remote in page.events {
                self.import_remote_event(user_id, remote).await?;
                imported += 1;
            }

            if query.page_token.is_none() {
                break;
            }
        }

        report.imported = imported;

        if let Some(token) = latest_sync_token {
            state.next_sync_token = Some(token);
        } else {
            debug!(user_id, "provider returned no sync token; keeping the stored one");
        }
        state.full_sync_completed = true;
        state.last_successful_sync_at = Some(Utc::now());
        self.sync_state.upsert(state).await?;

        Ok(())
    }

    /// Upsert one remote event; the remote version overwrites local edits.
    /// A cancelled remote event soft deletes the local copy.
    async fn import_remote_event(&self, user_id: &str, remote: RemoteCalendarEvent) -> Result<()> {
        let cancelled = remote.status.as_deref() == Some("cancelled");
        let now = Utc::now();

        let event = CanonicalEvent {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            source: EventSource::Calendar,
            external_id: Some(remote.external_id),
            title: remote.title,
            description: remote.description,
            start_time: remote.start_time,
            end_time: remote.end_time,
            all_day: remote.all_day,
            location: remote.location,
            attendees: remote.attendees,
            status: remote.status,
            etag: remote.etag,
            sequence: remote.sequence,
            sync_status: if cancelled { EventSyncStatus::Deleted } else { EventSyncStatus::Synced },
            sync_error: None,
            timezone: "UTC".to_string(),
            metadata: remote.metadata,
            created_at: now,
            updated_at: now,
        };

        self.events.upsert_imported(event).await
    }

    /// Export sub-flow: push every pending/error local event. Per-event
    /// failures are recorded on the row and in the error log, then the loop
    /// continues; nothing is retried automatically.
    async fn export(
        &self,
        user_id: &str,
        access_token: &str,
        state: &SyncState,
        report: &mut CalendarSyncReport,
    ) {
        let pending = match self.events.list_pending_exports(user_id).await {
            Ok(events) => events,
            Err(err) => {
                report.errors.push(format!("could not list pending exports: {err}"));
                return;
            }
        };

        let calendar_id =
            state.calendar_id.clone().unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string());

        for event in pending {
            let draft = draft_from_event(&event);
            let result = match event.external_id.as_deref() {
                None => self.provider.create_event(access_token, &calendar_id, &draft).await,
                Some(external_id) => {
                    self.provider.update_event(access_token, &calendar_id, external_id, &draft).await
                }
            };

            match result {
                Ok(remote) => {
                    let outcome = ExportOutcome::Synced { external_id: remote.external_id };
                    if let Err(err) =
                        self.events.record_export_outcome(user_id, &event.id, &outcome).await
                    {
                        report.errors.push(format!("event {}: {err}", event.id));
                        continue;
                    }
                    report.exported += 1;
                }
                Err(err) => {
                    error!(user_id, event_id = %event.id, error = %err, "event export failed");
                    let outcome = ExportOutcome::Failed { error: err.to_string() };
                    if let Err(store_err) =
                        self.events.record_export_outcome(user_id, &event.id, &outcome).await
                    {
                        warn!(user_id, error = %store_err, "could not record export failure");
                    }
                    self.log_error(user_id, &format!("export of {} failed: {err}", event.id)).await;
                    report.errors.push(format!("event {}: {err}", event.id));
                }
            }
        }
    }

    /// Export one event outside a sync run (create/update call paths).
    async fn export_one(
        &self,
        user_id: &str,
        event_id: &str,
        draft: &EventDraft,
        external_id: Option<&str>,
    ) {
        let access_token = match self.tokens.access_token(user_id).await {
            Ok(token) => token,
            Err(err) => {
                debug!(user_id, event_id, error = %err, "export deferred, no valid token");
                let outcome = ExportOutcome::Failed { error: err.to_string() };
                if let Err(store_err) =
                    self.events.record_export_outcome(user_id, event_id, &outcome).await
                {
                    warn!(user_id, error = %store_err, "could not record export failure");
                }
                return;
            }
        };

        let calendar_id = match self.sync_state.get(user_id, provider::CALENDAR).await {
            Ok(Some(state)) => {
                state.calendar_id.unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string())
            }
            _ => DEFAULT_CALENDAR_ID.to_string(),
        };

        let result = match external_id {
            None => self.provider.create_event(&access_token, &calendar_id, draft).await,
            Some(id) => self.provider.update_event(&access_token, &calendar_id, id, draft).await,
        };

        let outcome = match result {
            Ok(remote) => ExportOutcome::Synced { external_id: remote.external_id },
            Err(err) => {
                error!(user_id, event_id, error = %err, "event export failed");
                self.log_error(user_id, &format!("export of {event_id} failed: {err}")).await;
                ExportOutcome::Failed { error: err.to_string() }
            }
        };

        if let Err(err) = self.events.record_export_outcome(user_id, event_id, &outcome).await {
            warn!(user_id, event_id, error = %err, "could not record export outcome");
        }
    }

    /// Issue a remote delete; an "already gone" answer is idempotent
    /// success.
    async fn remote_delete(&self, user_id: &str, external_id: &str) -> Result<()> {
        let access_token = self.tokens.access_token(user_id).await?;
        let calendar_id = match self.sync_state.get(user_id, provider::CALENDAR).await? {
            Some(state) => state.calendar_id.unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string()),
            None => DEFAULT_CALENDAR_ID.to_string(),
        };

        match self.provider.delete_event(&access_token, &calendar_id, external_id).await {
            Ok(()) => Ok(()),
            Err(DaybridgeError::Conflict(_)) => {
                debug!(user_id, external_id, "remote event already gone, treating as deleted");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn log_error(&self, user_id: &str, message: &str) {
        let record = SyncErrorRecord {
            user_id: user_id.to_string(),
            provider: provider::CALENDAR.to_string(),
            message: message.to_string(),
            details: serde_json::Value::Null,
            occurred_at: Utc::now(),
        };

        if let Err(err) = self.error_log.append(&record).await {
            warn!(user_id, error = %err, "failed to append sync error record");
        }
    }
}

fn draft_from_event(event: &CanonicalEvent) -> EventDraft {
    EventDraft {
        title: event.title.clone(),
        description: event.description.clone(),
        start_time: event.start_time,
        end_time: event.end_time,
        all_day: event.all_day,
        location: event.location.clone(),
        attendees: event.attendees.clone(),
        timezone: event.timezone.clone(),
        metadata: event.metadata.clone(),
    }
}
