//! Lifelog sync engine
//!
//! Date-bounded, cursor-paginated importer with day-granularity
//! resumability. One bad day never blocks the rest of the range: a failed
//! date is logged, reported, and the outer loop moves on.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use daybridge_domain::{
    provider, CanonicalEvent, DaybridgeError, EventSource, EventSyncStatus, LifelogEntry,
    LifelogSyncReport, Result, SyncErrorRecord, SyncProgress, SyncState, SyncStats, Transcript,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::provider_ports::LifelogProvider;
use crate::store_ports::{EventStore, SyncErrorLog, SyncStateStore, TranscriptStore};

/// Tuning knobs for the lifelog engine.
#[derive(Debug, Clone)]
pub struct LifelogSyncConfig {
    /// Records fetched per page request.
    pub batch_size: u32,
    /// Pause between per-date iterations to respect provider rate limits.
    pub date_delay: Duration,
}

impl Default for LifelogSyncConfig {
    fn default() -> Self {
        Self { batch_size: 50, date_delay: Duration::from_millis(100) }
    }
}

/// Cursor-paginated lifelog importer. Every entry lands twice: as a
/// transcript row and as a lifelog-source event on the canonical timeline,
/// where calendar overlap detection can see it.
pub struct LifelogSyncEngine {
    provider: Arc<dyn LifelogProvider>,
    transcripts: Arc<dyn TranscriptStore>,
    events: Arc<dyn EventStore>,
    sync_state: Arc<dyn SyncStateStore>,
    error_log: Arc<dyn SyncErrorLog>,
    config: LifelogSyncConfig,
}

impl LifelogSyncEngine {
    /// Create a new engine instance.
    pub fn new(
        provider: Arc<dyn LifelogProvider>,
        transcripts: Arc<dyn TranscriptStore>,
        events: Arc<dyn EventStore>,
        sync_state: Arc<dyn SyncStateStore>,
        error_log: Arc<dyn SyncErrorLog>,
        config: LifelogSyncConfig,
    ) -> Self {
        Self { provider, transcripts, events, sync_state, error_log, config }
    }

    /// Sync lifelogs for an inclusive date range.
    ///
    /// Iterates dates from `start` to `end` (default: today). For each date
    /// an inner cursor loop fetches pages and upserts every entry as a
    /// transcript. After each date completes, success or failure, the sync
    /// state is persisted with that date, making a crashed run resumable at
    /// day granularity; a half-finished day's partial cursor is never
    /// persisted mid-date.
    #[instrument(skip(self, progress), fields(user_id, %start))]
    pub async fn sync_from_date(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        timezone: &str,
        progress: Option<UnboundedSender<SyncProgress>>,
    ) -> Result<LifelogSyncReport> {
        let end = end.unwrap_or_else(|| Utc::now().date_naive());
        if start > end {
            return Err(DaybridgeError::InvalidInput(format!(
                "start date {start} is after end date {end}"
            )));
        }

        info!(user_id, %start, %end, "starting lifelog sync");

        // The persisted counter is monotonic across runs; the report carries
        // this run's total only.
        let mut state = self
            .sync_state
            .get(user_id, provider::LIFELOG)
            .await?
            .unwrap_or_else(|| SyncState::new(user_id, provider::LIFELOG));

        let mut report =
            LifelogSyncReport { total_synced: 0, last_sync_date: start, errors: Vec::new() };

        let mut current = start;
        while current <= end {
            match self.sync_date_with_cursor(user_id, current, timezone, progress.as_ref()).await {
                Ok(date_synced) => {
                    report.total_synced += date_synced;
                    state.total_synced += date_synced;
                    state.last_successful_sync_at = Some(Utc::now());

                    send_progress(
                        progress.as_ref(),
                        SyncProgress::DateCompleted {
                            date: current,
                            synced_count: date_synced,
                            total_synced: report.total_synced,
                        },
                    );

                    info!(user_id, date = %current, date_synced, "synced lifelogs for date");
                }
                Err(err) => {
                    let message = format!("error syncing {current}: {err}");
                    error!(user_id, date = %current, error = %err, "lifelog date sync failed");
                    report.errors.push(message.clone());
                    state.error_count += 1;

                    self.log_error(user_id, &message, current).await;

                    send_progress(
                        progress.as_ref(),
                        SyncProgress::DateFailed { date: current, error: message },
                    );
                }
            }

            // Persist the bookmark after the date completes either way; a
            // re-run re-processes this date, which is safe because upserts
            // key on (user, external_id).
            report.last_sync_date = current;
            state.last_sync_date = Some(current);
            state.last_sync_at = Some(Utc::now());
            self.sync_state.upsert(&state).await?;

            current = match current.succ_opt() {
                Some(next) => next,
                None => break,
            };

            if !self.config.date_delay.is_zero() {
                tokio::time::sleep(self.config.date_delay).await;
            }
        }

        send_progress(
            progress.as_ref(),
            SyncProgress::RunCompleted { total_synced: report.total_synced },
        );

        info!(user_id, total_synced = report.total_synced, "lifelog sync completed");
        Ok(report)
    }

    /// Resume syncing from the stored bookmark.
    ///
    /// With no prior state this defaults to yesterday. With prior state it
    /// resumes from the stored `last_sync_date` itself, not the day after:
    /// re-processing that date is expected and idempotent.
    #[instrument(skip(self, progress), fields(user_id))]
    pub async fn incremental_sync(
        &self,
        user_id: &str,
        timezone: &str,
        progress: Option<UnboundedSender<SyncProgress>>,
    ) -> Result<LifelogSyncReport> {
        let start = match self.sync_state.get(user_id, provider::LIFELOG).await? {
            Some(state) => state.last_sync_date.unwrap_or_else(yesterday),
            None => yesterday(),
        };

        debug!(user_id, %start, "incremental lifelog sync resuming");
        self.sync_from_date(user_id, start, None, timezone, progress).await
    }

    /// Probe one date for available data without syncing it.
    pub async fn sync_stats(
        &self,
        user_id: &str,
        date: NaiveDate,
        timezone: &str,
    ) -> Result<SyncStats> {
        let page = self.provider.list_by_date(date, timezone, None, Some(1)).await?;
        debug!(user_id, %date, count = page.count, "fetched sync stats");

        Ok(SyncStats {
            date,
            has_data: !page.entries.is_empty(),
            estimated_count: page.count,
            has_more_pages: page.has_more,
        })
    }

    /// Inner cursor loop for one date. Any page or store failure aborts the
    /// date and bubbles up to the outer loop.
    async fn sync_date_with_cursor(
        &self,
        user_id: &str,
        date: NaiveDate,
        timezone: &str,
        progress: Option<&UnboundedSender<SyncProgress>>,
    ) -> Result<i64> {
        let mut total_synced = 0i64;
        let mut cursor: Option<String> = None;
        let mut has_more = true;

        while has_more {
            let page = self
                .provider
                .list_by_date(date, timezone, cursor.as_deref(), Some(self.config.batch_size))
                .await?;

            cursor = page.next_cursor.clone();
            has_more = page.has_more;

            if !page.entries.is_empty() {
                let batch_size = page.entries.len();
                let batch_synced = self.process_batch(user_id, timezone, page.entries).await;
                total_synced += batch_synced;

                send_progress(
                    progress,
                    SyncProgress::BatchProcessed { date, batch_size, batch_synced, has_more },
                );
            }

            debug!(user_id, %date, cursor = ?cursor, has_more, "processed lifelog page");
        }

        Ok(total_synced)
    }

    /// Upsert a batch of entries; a bad entry is logged and skipped rather
    /// than failing the whole date.
    async fn process_batch(&self, user_id: &str, timezone: &str, entries: Vec<LifelogEntry>) -> i64 {
        let mut processed = 0i64;

        for entry in entries {
            let entry_id = entry.id.clone();
            let event = event_from_entry(user_id, timezone, &entry);
            match self.transcripts.upsert(transcript_from_entry(user_id, entry)).await {
                Ok(()) => processed += 1,
                Err(err) => {
                    warn!(user_id, lifelog_id = %entry_id, error = %err, "failed to save lifelog");
                    continue;
                }
            }

            // Mirror the recording onto the canonical timeline; a failed
            // mirror is retried on the next (idempotent) re-sync.
            if let Err(err) = self.events.upsert_imported(event).await {
                warn!(user_id, lifelog_id = %entry_id, error = %err, "failed to mirror lifelog event");
            }
        }

        processed
    }

    async fn log_error(&self, user_id: &str, message: &str, date: NaiveDate) {
        let record = SyncErrorRecord {
            user_id: user_id.to_string(),
            provider: provider::LIFELOG.to_string(),
            message: message.to_string(),
            details: serde_json::json!({ "date": date.to_string() }),
            occurred_at: Utc::now(),
        };

        // The error log is itself best-effort; a failed append must not mask
        // the original failure.
        if let Err(err) = self.error_log.append(&record).await {
            warn!(user_id, error = %err, "failed to append sync error record");
        }
    }
}

/// Title for display, with a stable fallback for untitled recordings.
fn display_title(entry: &LifelogEntry) -> String {
    if entry.title.is_empty() {
        let short_id: String = entry.id.chars().take(8).collect();
        format!("Lifelog Recording {short_id}")
    } else {
        entry.title.clone()
    }
}

/// Build the transcript row for a lifelog entry. Status is always
/// "completed" because lifelog content arrives pre-transcribed.
fn transcript_from_entry(user_id: &str, entry: LifelogEntry) -> Transcript {
    let title = display_title(&entry);

    let raw_content = serde_json::json!({
        "title": entry.title,
        "content": entry.content,
        "markdown": entry.markdown,
        "created_at": entry.created_at.to_rfc3339(),
        "updated_at": entry.updated_at.to_rfc3339(),
    });

    Transcript {
        id: Uuid::now_v7().to_string(),
        user_id: user_id.to_string(),
        external_id: entry.id,
        title,
        source: provider::LIFELOG.to_string(),
        audio_url: entry.audio_url,
        transcript_text: entry.transcript_text,
        status: "completed".to_string(),
        raw_content,
        processed_at: Utc::now(),
        created_at: entry.created_at,
        updated_at: entry.updated_at,
    }
}

/// Build the canonical timeline event for a lifelog entry. Rows key on
/// `(user, lifelog, entry id)`, so re-imports update in place. The entry's
/// own timestamps bound the recording interval.
fn event_from_entry(user_id: &str, timezone: &str, entry: &LifelogEntry) -> CanonicalEvent {
    let now = Utc::now();
    CanonicalEvent {
        id: Uuid::now_v7().to_string(),
        user_id: user_id.to_string(),
        source: EventSource::Lifelog,
        external_id: Some(entry.id.clone()),
        title: display_title(entry),
        description: (!entry.content.is_empty()).then(|| entry.content.clone()),
        start_time: entry.created_at,
        end_time: entry.updated_at.max(entry.created_at),
        all_day: false,
        location: None,
        attendees: Vec::new(),
        status: Some("confirmed".to_string()),
        etag: None,
        sequence: 0,
        sync_status: EventSyncStatus::Synced,
        sync_error: None,
        timezone: timezone.to_string(),
        metadata: serde_json::Value::Null,
        created_at: now,
        updated_at: now,
    }
}

fn yesterday() -> NaiveDate {
    Utc::now().date_naive().pred_opt().unwrap_or_else(|| Utc::now().date_naive())
}

fn send_progress(tx: Option<&UnboundedSender<SyncProgress>>, message: SyncProgress) {
    if let Some(tx) = tx {
        // Best-effort: a dropped receiver never affects the sync outcome.
        let _ = tx.send(message);
    }
}
