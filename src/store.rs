//! SQLite-backed key/value store for JSON-encoded values.

use directories::ProjectDirs;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Environment variable that overrides the database location.
pub const DB_PATH_ENV: &str = "FOCUSNOOK_DB";

/// Logical keys of the persisted records.
pub mod keys {
    /// Focus and break lengths as [`PomodoroSettings`](crate::models::PomodoroSettings).
    pub const POMODORO_SETTINGS: &str = "pomodoroSettings";
    /// Daily and all-time totals as [`StatsSnapshot`](crate::models::StatsSnapshot).
    pub const STATS: &str = "stats";

    // Owned by collaborators; the core never looks inside these.
    pub const THEME: &str = "theme";
    pub const NOTES: &str = "notes";
    pub const TODOS: &str = "todos";
    pub const AMBIENT_VOLUMES: &str = "ambientVolumes";
}

/// Failures from the key/value database.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to create database directory {0}")]
    DirectoryCreation(PathBuf),
}

/// Shared handle to the key/value database.
///
/// Cloning is cheap; all clones talk to the same connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens the database in the platform data directory, or at `FOCUSNOOK_DB` if set.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(Self::default_path())
    }

    /// Opens (creating if needed) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|_| StoreError::DirectoryCreation(parent.to_path_buf()))?;
        }

        let conn = Connection::open(path)?;
        Self::initialize_tables(&conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Creates an in-memory database that lives as long as the handle.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_tables(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn initialize_tables(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(DB_PATH_ENV) {
            return PathBuf::from(path);
        }
        ProjectDirs::from("com", "focusnook", "Focusnook")
            .map(|dirs| dirs.data_dir().join("focusnook.db"))
            .unwrap_or_else(|| PathBuf::from("focusnook.db"))
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the stored value for `key`, or `fallback` when it is absent or unreadable.
    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.try_get(key) {
            Ok(Some(value)) => value,
            Ok(None) => fallback,
            Err(e) => {
                warn!("Ignoring stored value for '{}': {}", key, e);
                fallback
            }
        }
    }

    /// Reads and decodes `key`, surfacing storage and decoding failures.
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_raw(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Serializes `value` and overwrites whatever was stored under `key`.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        self.set_raw(key, &json)
    }

    /// Reads the undecoded value for `key`.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Stores `value` as-is under `key`.
    pub fn set_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Deletes `key`. Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.conn()
            .execute("DELETE FROM kv_store WHERE key = ?", [key])?;
        Ok(())
    }

    /// Makes every subsequent read and write fail, simulating a broken backend.
    #[cfg(test)]
    pub(crate) fn break_backend(&self) {
        self.conn()
            .execute_batch("DROP TABLE kv_store;")
            .expect("drop table");
    }
}
