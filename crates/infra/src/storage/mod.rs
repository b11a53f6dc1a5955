//! SQLite storage plumbing: connection pool and schema manager.

pub mod manager;
pub mod pool;

pub use manager::DbManager;
pub use pool::{create_pool, DbConnection, DbPool};
