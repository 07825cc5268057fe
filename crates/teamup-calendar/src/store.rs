//! SQLite table holding the current week's recurring events.

use rusqlite::{params, Connection};

use crate::db::{db, Database, StoreResult};
use crate::types::{EventRecord, NewEvent};

const TABLE: &str = "teamup_events";

/// Snapshot store with whole-table replace semantics.
///
/// Rows are never updated or deleted one by one. Ids use the SQLite rowid,
/// so numbering restarts at 1 after every flush.
#[derive(Clone)]
pub struct EventStore {
    db: Database,
}

impl EventStore {
    /// Create the store, making sure the table exists.
    pub fn new(database: Database) -> StoreResult<Self> {
        let store = Self { db: database };
        store.create_table()?;
        Ok(store)
    }

    /// Create the table if it is missing.
    pub fn create_table(&self) -> StoreResult<()> {
        db(self.db.lock().execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {TABLE} (
                id INTEGER PRIMARY KEY,
                event_id TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                title TEXT NOT NULL,
                location TEXT NOT NULL,
                trainer TEXT NOT NULL,
                contact TEXT NOT NULL,
                age TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{TABLE}_event_id ON {TABLE}(event_id);
            "#
        )))
    }

    /// Remove the table entirely.
    pub fn drop_table(&self) -> StoreResult<()> {
        db(self
            .db
            .lock()
            .execute_batch(&format!("DROP TABLE IF EXISTS {TABLE};")))
    }

    /// Remove every row.
    pub fn flush(&self) -> StoreResult<()> {
        db(self.db.lock().execute(&format!("DELETE FROM {TABLE}"), []))?;
        Ok(())
    }

    /// Append rows in the given order.
    pub fn insert_many(&self, rows: &[NewEvent]) -> StoreResult<()> {
        let mut conn = self.db.lock();
        let tx = db(conn.transaction())?;
        Self::insert_rows(&tx, rows)?;
        db(tx.commit())
    }

    /// Flush and insert in one transaction, so readers never see an empty table
    /// in between.
    pub fn replace_snapshot(&self, rows: &[NewEvent]) -> StoreResult<()> {
        let mut conn = self.db.lock();
        let tx = db(conn.transaction())?;
        db(tx.execute(&format!("DELETE FROM {TABLE}"), []))?;
        Self::insert_rows(&tx, rows)?;
        db(tx.commit())
    }

    fn insert_rows(conn: &Connection, rows: &[NewEvent]) -> StoreResult<()> {
        let mut stmt = db(conn.prepare(&format!(
            "INSERT INTO {TABLE} (event_id, start_time, end_time, title, location, trainer, contact, age) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        )))?;

        for row in rows {
            db(stmt.execute(params![
                row.event_id,
                row.start_time,
                row.end_time,
                row.title,
                row.location,
                row.trainer,
                row.contact,
                row.age,
            ]))?;
        }
        Ok(())
    }

    /// All rows in insertion order.
    pub fn query_all(&self) -> StoreResult<Vec<EventRecord>> {
        let conn = self.db.lock();
        let mut stmt = db(conn.prepare(&format!(
            "SELECT id, event_id, start_time, end_time, title, location, trainer, contact, age \
             FROM {TABLE} ORDER BY id ASC"
        )))?;

        let rows = db(stmt.query_map([], Self::row_to_record))?;
        db(rows.collect::<Result<Vec<_>, _>>())
    }

    /// Look up one row by storage id.
    pub fn find(&self, id: i64) -> StoreResult<Option<EventRecord>> {
        self.find_where("id = ?1", params![id])
    }

    /// First row (in insertion order) carrying the given Teamup event id.
    pub fn find_by_event_id(&self, event_id: &str) -> StoreResult<Option<EventRecord>> {
        self.find_where("event_id = ?1 ORDER BY id ASC LIMIT 1", params![event_id])
    }

    fn find_where(
        &self,
        filter: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> StoreResult<Option<EventRecord>> {
        let conn = self.db.lock();
        let mut stmt = db(conn.prepare(&format!(
            "SELECT id, event_id, start_time, end_time, title, location, trainer, contact, age \
             FROM {TABLE} WHERE {filter}"
        )))?;

        let mut rows = db(stmt.query(args))?;
        match db(rows.next())? {
            Some(row) => Ok(Some(db(Self::row_to_record(row))?)),
            None => Ok(None),
        }
    }

    /// Number of stored rows.
    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 = db(self.db.lock().query_row(
            &format!("SELECT COUNT(*) FROM {TABLE}"),
            [],
            |row| row.get(0),
        ))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Insert a row with a fixed id.
    #[cfg(test)]
    pub(crate) fn insert_record(&self, record: &EventRecord) -> StoreResult<()> {
        db(self.db.lock().execute(
            &format!(
                "INSERT INTO {TABLE} (id, event_id, start_time, end_time, title, location, trainer, contact, age) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                record.id,
                record.event_id,
                record.start_time,
                record.end_time,
                record.title,
                record.location,
                record.trainer,
                record.contact,
                record.age,
            ],
        ))?;
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<EventRecord> {
        Ok(EventRecord {
            id: row.get(0)?,
            event_id: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            title: row.get(4)?,
            location: row.get(5)?,
            trainer: row.get(6)?,
            contact: row.get(7)?,
            age: row.get(8)?,
        })
    }
}
