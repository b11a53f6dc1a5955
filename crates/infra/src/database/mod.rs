//! SQLite-backed implementations of the core store ports.

mod row;

pub mod conflict_repository;
pub mod event_repository;
pub mod sync_error_repository;
pub mod sync_state_repository;
pub mod token_repository;
pub mod transcript_repository;

pub use conflict_repository::SqliteConflictRepository;
pub use event_repository::SqliteEventRepository;
pub use sync_error_repository::SqliteSyncErrorLog;
pub use sync_state_repository::SqliteSyncStateRepository;
pub use token_repository::SqliteTokenRepository;
pub use transcript_repository::SqliteTranscriptRepository;
