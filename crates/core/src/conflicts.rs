//! Cross-source conflict detection
//!
//! Read-only scan over a user's non-deleted events. Flags every pair from
//! differing sources whose `[start, end)` intervals strictly overlap.
//! Same-source overlaps are never flagged: a single provider's own
//! scheduling is assumed authoritative for itself. Conflicts are surfaced,
//! never auto-resolved.

use std::sync::Arc;

use chrono::Utc;
use daybridge_domain::{CanonicalEvent, Result, SyncConflict};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::store_ports::{ConflictStore, EventStore};

/// Time-overlap scanner over the canonical store.
pub struct ConflictDetector {
    events: Arc<dyn EventStore>,
    conflicts: Arc<dyn ConflictStore>,
}

impl ConflictDetector {
    /// Create a new detector.
    pub fn new(events: Arc<dyn EventStore>, conflicts: Arc<dyn ConflictStore>) -> Self {
        Self { events, conflicts }
    }

    /// Scan a user's events and persist one conflict per overlapping
    /// cross-source pair. Re-running the scan updates existing conflicts
    /// rather than duplicating them; the returned rows are the stored
    /// ones, so a re-detected pair carries its original id and any prior
    /// resolution.
    #[instrument(skip(self), fields(user_id))]
    pub async fn detect(&self, user_id: &str) -> Result<Vec<SyncConflict>> {
        let events = self.events.list_active(user_id, None, None, None).await?;
        let mut detected = Vec::new();

        for (i, first) in events.iter().enumerate() {
            for second in events.iter().skip(i + 1) {
                if first.source == second.source {
                    continue;
                }
                if !overlaps(first, second) {
                    continue;
                }

                // Order the pair by local id so re-detection hits the same
                // uniqueness key.
                let (a, b) = if first.id <= second.id { (first, second) } else { (second, first) };

                let conflict = SyncConflict {
                    id: Uuid::now_v7().to_string(),
                    user_id: user_id.to_string(),
                    event_id: a.id.clone(),
                    conflicting_event_id: b.id.clone(),
                    description: format!(
                        "Time overlap between {} and {} events",
                        a.source.as_str(),
                        b.source.as_str()
                    ),
                    resolved: false,
                    resolution: None,
                    notes: None,
                    detected_at: Utc::now(),
                };

                let stored = self.conflicts.upsert(&conflict).await?;
                detected.push(stored);
            }
        }

        debug!(user_id, conflict_count = detected.len(), "conflict scan finished");
        Ok(detected)
    }

    /// Unresolved conflicts for a user.
    pub async fn unresolved(&self, user_id: &str) -> Result<Vec<SyncConflict>> {
        self.conflicts.list_unresolved(user_id).await
    }

    /// Explicitly resolve one conflict.
    pub async fn resolve(
        &self,
        user_id: &str,
        conflict_id: &str,
        resolution: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        self.conflicts.resolve(user_id, conflict_id, resolution, notes).await
    }
}

/// Strict interval overlap: `a.start < b.end && a.end > b.start`. Events
/// that merely touch at a boundary do not overlap.
fn overlaps(a: &CanonicalEvent, b: &CanonicalEvent) -> bool {
    a.start_time < b.end_time && a.end_time > b.start_time
}
