//! # Daybridge Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The lifelog and calendar sync engines
//! - OAuth token lifecycle management
//! - Cross-source conflict detection
//! - Port/adapter interfaces (traits)
//!
//! ## Architecture Principles
//! - Only depends on `daybridge-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - One sync run per user at a time is an external invariant; the engines
//!   implement no internal locking

pub mod calendar;
pub mod conflicts;
pub mod lifelog;
pub mod tokens;

// Infrastructure ports
pub mod provider_ports;
pub mod store_ports;

// Re-export specific items to avoid ambiguity
pub use calendar::CalendarSyncEngine;
pub use conflicts::ConflictDetector;
pub use lifelog::{LifelogSyncConfig, LifelogSyncEngine};
pub use provider_ports::{
    CalendarListing, CalendarProvider, EventPage, EventQuery, LifelogPage, LifelogProvider,
    OAuthApi, RemoteCalendarEvent, TokenCipher,
};
pub use store_ports::{
    ConflictStore, EventStore, ExportOutcome, SyncErrorLog, SyncStateStore, TokenStore,
    TranscriptStore,
};
pub use tokens::TokenLifecycleManager;
