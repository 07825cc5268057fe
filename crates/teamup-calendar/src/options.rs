//! Persisted key/value options (freshness marker, schema version).

use rusqlite::{params, OptionalExtension};

use crate::db::{db, Database, StoreResult};

/// Option holding the Monday of the last successful refresh.
pub const LAST_FETCH_KEY: &str = "teamup_last_fetch";

/// Option holding the version that created the events table.
pub const DB_VERSION_KEY: &str = "teamup_db_version";

/// Small persisted settings store with an explicit lifecycle.
pub trait OptionStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Read a value, falling back to `default` when absent.
    fn get_or(&self, key: &str, default: &str) -> StoreResult<String> {
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }
}

/// `OptionStore` backed by a `teamup_options` table.
#[derive(Clone)]
pub struct SqliteOptions {
    db: Database,
}

impl SqliteOptions {
    pub fn new(database: Database) -> StoreResult<Self> {
        db(database.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS teamup_options (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        ))?;
        Ok(Self { db: database })
    }
}

impl OptionStore for SqliteOptions {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        db(self
            .db
            .lock()
            .query_row(
                "SELECT value FROM teamup_options WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        db(self.db.lock().execute(
            "INSERT OR REPLACE INTO teamup_options (key, value) VALUES (?1, ?2)",
            params![key, value],
        ))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        db(self
            .db
            .lock()
            .execute("DELETE FROM teamup_options WHERE key = ?1", params![key]))?;
        Ok(())
    }
}
