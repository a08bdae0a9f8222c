//! SQLite-file storage area.
//!
//! Backs the local scope: a single `kv` table in a SQLite file, shared by
//! any process that opens the same path.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, StoreError};

use super::StorageArea;

/// Durable storage area stored in a SQLite file.
pub struct SqliteArea {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteArea {
    /// Open a storage area at `path`, creating the file and schema if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Sqlite` if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }

    /// Path this area was opened at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Storage("SQLite connection poisoned".to_string()))
    }
}

impl StorageArea for SqliteArea {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip() {
        let dir = tempdir().expect("tempdir should succeed");
        let path = dir.path().join("kv.db");

        let area = SqliteArea::open(&path).expect("open should succeed");
        assert_eq!(area.get_item("a").expect("get should succeed"), None);

        area.set_item("a", "{\"n\":1}").expect("set should succeed");
        assert_eq!(
            area.get_item("a").expect("get should succeed"),
            Some("{\"n\":1}".to_string())
        );
    }

    #[test]
    fn test_persists_across_opens() {
        let dir = tempdir().expect("tempdir should succeed");
        let path = dir.path().join("kv.db");

        {
            let area = SqliteArea::open(&path).expect("open should succeed");
            area.set_item("counter", "5").expect("set should succeed");
        }

        let reopened = SqliteArea::open(&path).expect("reopen should succeed");
        assert_eq!(
            reopened.get_item("counter").expect("get should succeed"),
            Some("5".to_string())
        );
    }

    #[test]
    fn test_remove_and_keys() {
        let dir = tempdir().expect("tempdir should succeed");
        let path = dir.path().join("kv.db");
        let area = SqliteArea::open(&path).expect("open should succeed");

        area.set_item("b", "2").expect("set should succeed");
        area.set_item("a", "1").expect("set should succeed");
        assert_eq!(
            area.keys().expect("keys should succeed"),
            vec!["a".to_string(), "b".to_string()]
        );

        area.remove_item("a").expect("remove should succeed");
        assert_eq!(area.keys().expect("keys should succeed"), vec!["b".to_string()]);
        area.remove_item("missing").expect("remove should succeed");
    }
}
