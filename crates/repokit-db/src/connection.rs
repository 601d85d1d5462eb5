//! Database connection management.
//!
//! Every model, query and repository shares one [`Database`] handle. The handle
//! is cheap to clone; all clones point at the same SQLite connection.

use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;
use tracing::debug;

use crate::error::{DbError, Result};

/// Shared SQLite connection handle.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) a database file.
    ///
    /// Missing parent directories are created and the connection is switched
    /// to WAL journaling.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the connection fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|err| DbError::ConnectionError(format!("{}: {err}", path.display())))?;

        // WAL mode for better concurrent access
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;

        debug!("opened database at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| DbError::ConnectionError(err.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps an already established connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Executes one or more SQL statements separated by semicolons.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.with_conn(|conn| conn.execute_batch(sql))
    }

    /// Runs `f` with exclusive access to the underlying connection.
    pub fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        Ok(f(&conn)?)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("repokit.db");

        let db = Database::open(&path).unwrap();
        db.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_clones_share_connection() {
        let db = Database::open_in_memory().unwrap();
        let other = db.clone();

        db.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY); INSERT INTO t DEFAULT VALUES;")
            .unwrap();

        let count: i64 = other
            .with_conn(|conn| conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0)))
            .unwrap();
        assert_eq!(count, 1);
    }
}
