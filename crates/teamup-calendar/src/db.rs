//! Shared SQLite connection for the event store and the option store.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use teamup_core::{DatabaseError, RusqliteErrorExt};

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, DatabaseError>;

/// Map a rusqlite result into the shared storage error.
pub(crate) fn db<T>(result: rusqlite::Result<T>) -> StoreResult<T> {
    result.map_err(RusqliteErrorExt::into_database_error)
}

/// Cheaply clonable handle to one SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
            }
        }

        let conn = db(Connection::open(path))?;
        tracing::debug!(path = %path.display(), "Opened schedule database");
        Ok(Self::from_connection(conn))
    }

    /// Create an in-memory database (tests and dry runs).
    pub fn in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(db(Connection::open_in_memory())?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Lock the connection for one statement or transaction.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}
