//! SQLite pool helpers
//!
//! Thin wrapper around r2d2 + rusqlite that applies the connection pragmas
//! every repository relies on and converts pool errors into the domain
//! error type.

use std::path::Path;
use std::sync::Arc;

use daybridge_domain::Result;
use r2d2_sqlite::SqliteConnectionManager;

use crate::errors::InfraError;

/// Shared connection pool used by every repository.
pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

/// One checked-out pool connection.
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Create an `Arc<DbPool>` for the database at `path`.
///
/// Every connection runs in WAL mode with foreign keys enforced and a busy
/// timeout, so concurrent readers never fail fast on a writer.
pub fn create_pool<P: AsRef<Path>>(path: P, max_size: u32) -> Result<Arc<DbPool>> {
    let manager = SqliteConnectionManager::file(path.as_ref()).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = r2d2::Pool::builder()
        .max_size(max_size.max(1))
        .build(manager)
        .map_err(InfraError::from)?;

    Ok(Arc::new(pool))
}

/// Acquire a connection, mapping the pool error into the domain error.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection> {
    pool.get().map_err(|e| InfraError::from(e).into())
}
