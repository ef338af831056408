//! SQLite-backed record store

use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;
use tracing::debug;

use crate::record::{Filter, FilterValue, Order, Record, SortDir};

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The record store
///
/// One table per record type, created on first use:
/// `(id TEXT PRIMARY KEY, data TEXT NOT NULL, updated_at INTEGER NOT NULL)`.
/// Not internally synchronized - intended to be owned by a single actor.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        debug!(path = %path.as_ref().display(), "Opened store");
        Ok(Self { conn })
    }

    /// Open an in-memory store (tests, ephemeral sessions)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    fn ensure_table(&self, table: &str) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY,
                    data TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                )"
            ),
            [],
        )?;
        Ok(())
    }

    /// Insert a single record
    pub fn insert<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        let table = R::table_name();
        self.ensure_table(table)?;
        let data = serde_json::to_string(record)?;
        self.conn.execute(
            &format!("INSERT INTO {table} (id, data, updated_at) VALUES (?1, ?2, ?3)"),
            rusqlite::params![record.id(), data, record.updated_at()],
        )?;
        debug!(table, id = record.id(), "insert");
        Ok(())
    }

    /// Insert a batch of records in a single transaction
    ///
    /// All-or-nothing: if any row fails, the transaction rolls back and no
    /// records are created.
    pub fn insert_many<R: Record>(&mut self, records: &[R]) -> Result<(), StoreError> {
        let table = R::table_name();
        self.ensure_table(table)?;
        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare(&format!("INSERT INTO {table} (id, data, updated_at) VALUES (?1, ?2, ?3)"))?;
            for record in records {
                let data = serde_json::to_string(record)?;
                stmt.execute(rusqlite::params![record.id(), data, record.updated_at()])?;
            }
        }
        tx.commit()?;
        debug!(table, count = records.len(), "insert_many");
        Ok(())
    }

    /// Update an existing record by id
    pub fn update<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        let table = R::table_name();
        self.ensure_table(table)?;
        let data = serde_json::to_string(record)?;
        let affected = self.conn.execute(
            &format!("UPDATE {table} SET data = ?2, updated_at = ?3 WHERE id = ?1"),
            rusqlite::params![record.id(), data, record.updated_at()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("{table}/{}", record.id())));
        }
        debug!(table, id = record.id(), "update");
        Ok(())
    }

    /// Delete a record by id, returning whether a row existed
    pub fn delete<R: Record>(&self, id: &str) -> Result<bool, StoreError> {
        let table = R::table_name();
        self.ensure_table(table)?;
        let affected = self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE id = ?1"), rusqlite::params![id])?;
        debug!(table, id, affected, "delete");
        Ok(affected > 0)
    }

    /// Get a record by id
    pub fn get<R: Record>(&self, id: &str) -> Result<Option<R>, StoreError> {
        let table = R::table_name();
        self.ensure_table(table)?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT data FROM {table} WHERE id = ?1"))?;
        let mut rows = stmt.query(rusqlite::params![id])?;
        match rows.next()? {
            Some(row) => {
                let data: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    /// List records with an optional field filter and ordering
    pub fn list<R: Record>(&self, filter: Option<&Filter>, order: Option<&Order>) -> Result<Vec<R>, StoreError> {
        let table = R::table_name();
        self.ensure_table(table)?;

        let mut sql = format!("SELECT data FROM {table}");
        if let Some(f) = filter {
            sql.push_str(&format!(" WHERE json_extract(data, '$.{}') = ?1", f.field));
        }
        if let Some(o) = order {
            let dir = match o.dir {
                SortDir::Asc => "ASC",
                SortDir::Desc => "DESC",
            };
            sql.push_str(&format!(" ORDER BY json_extract(data, '$.{}') {dir}", o.field));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = match filter.map(|f| &f.value) {
            Some(FilterValue::Text(s)) => stmt.query(rusqlite::params![s])?,
            Some(FilterValue::Int(n)) => stmt.query(rusqlite::params![n])?,
            Some(FilterValue::Bool(b)) => stmt.query(rusqlite::params![b])?,
            None => stmt.query([])?,
        };

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let data: String = row.get(0)?;
            records.push(serde_json::from_str(&data)?);
        }
        Ok(records)
    }

    /// Count records matching an optional filter
    pub fn count<R: Record>(&self, filter: Option<&Filter>) -> Result<u64, StoreError> {
        let table = R::table_name();
        self.ensure_table(table)?;

        let mut sql = format!("SELECT COUNT(*) FROM {table}");
        if let Some(f) = filter {
            sql.push_str(&format!(" WHERE json_extract(data, '$.{}') = ?1", f.field));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let count: i64 = match filter.map(|f| &f.value) {
            Some(FilterValue::Text(s)) => stmt.query_row(rusqlite::params![s], |row| row.get(0))?,
            Some(FilterValue::Int(n)) => stmt.query_row(rusqlite::params![n], |row| row.get(0))?,
            Some(FilterValue::Bool(b)) => stmt.query_row(rusqlite::params![b], |row| row.get(0))?,
            None => stmt.query_row([], |row| row.get(0))?,
        };
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{new_id, now_ms};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        title: String,
        rank: i64,
        done: bool,
        updated_at: i64,
    }

    impl Note {
        fn new(title: &str, rank: i64) -> Self {
            Self {
                id: new_id(),
                title: title.to_string(),
                rank,
                done: false,
                updated_at: now_ms(),
            }
        }
    }

    impl Record for Note {
        fn id(&self) -> &str {
            &self.id
        }

        fn updated_at(&self) -> i64 {
            self.updated_at
        }

        fn table_name() -> &'static str {
            "notes"
        }
    }

    #[test]
    fn test_insert_get_update_delete() {
        let store = Store::open_in_memory().unwrap();

        let mut note = Note::new("first", 0);
        store.insert(&note).unwrap();

        let loaded: Note = store.get(&note.id).unwrap().unwrap();
        assert_eq!(loaded, note);

        note.title = "renamed".to_string();
        note.updated_at = now_ms();
        store.update(&note).unwrap();
        let loaded: Note = store.get(&note.id).unwrap().unwrap();
        assert_eq!(loaded.title, "renamed");

        assert!(store.delete::<Note>(&note.id).unwrap());
        assert!(!store.delete::<Note>(&note.id).unwrap());
        assert!(store.get::<Note>(&note.id).unwrap().is_none());
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let note = Note::new("ghost", 0);
        // Table exists but row doesn't
        store.insert(&Note::new("other", 1)).unwrap();
        let err = store.update(&note).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_list_filter_and_order() {
        let store = Store::open_in_memory().unwrap();
        let mut a = Note::new("a", 2);
        let b = Note::new("b", 0);
        let c = Note::new("c", 1);
        a.done = true;
        store.insert(&a).unwrap();
        store.insert(&b).unwrap();
        store.insert(&c).unwrap();

        let all: Vec<Note> = store.list(None, Some(&Order::asc("rank"))).unwrap();
        assert_eq!(
            all.iter().map(|n| n.title.as_str()).collect::<Vec<_>>(),
            vec!["b", "c", "a"]
        );

        let done: Vec<Note> = store.list(Some(&Filter::boolean("done", true)), None).unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].title, "a");

        let by_title: Vec<Note> = store.list(Some(&Filter::text("title", "c")), None).unwrap();
        assert_eq!(by_title.len(), 1);

        let by_rank: Vec<Note> = store.list(Some(&Filter::int("rank", 1)), None).unwrap();
        assert_eq!(by_rank.len(), 1);
        assert_eq!(by_rank[0].title, "c");

        assert_eq!(store.count::<Note>(None).unwrap(), 3);
        assert_eq!(store.count::<Note>(Some(&Filter::boolean("done", false))).unwrap(), 2);
    }

    #[test]
    fn test_insert_many_is_atomic() {
        let mut store = Store::open_in_memory().unwrap();
        let a = Note::new("a", 0);
        let mut dup = Note::new("dup", 1);
        dup.id = a.id.clone(); // primary key conflict on the second row

        let result = store.insert_many(&[a, dup]);
        assert!(result.is_err());
        // Nothing was created - the whole batch rolled back
        assert_eq!(store.count::<Note>(None).unwrap(), 0);
    }

    #[test]
    fn test_open_on_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested").join("store.db");
        let store = Store::open(&path).unwrap();
        store.insert(&Note::new("persisted", 0)).unwrap();
        drop(store);

        let store = Store::open(&path).unwrap();
        assert_eq!(store.count::<Note>(None).unwrap(), 1);
    }
}
