//! SQLite-based session storage.
//!
//! Provides persistent storage for:
//! - Completed work sessions (the durable [`SessionSink`])
//! - Key-value store for application state, such as the serialized engine
//!
//! Several host processes may share one database file. A host that loads
//! the engine, ticks it and saves it back does so inside
//! [`Database::immediate_transaction`], so a phase completes exactly once
//! no matter how many hosts observe the deadline.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

use super::data_dir;
use crate::error::{CoreError, DatabaseError, Result};
use crate::stats::{Session, SessionSink};
use crate::timer::PomodoroEngine;

const ENGINE_KEY: &str = "timer_engine";

/// How long a writer waits for another host to release the database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/converge.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("converge.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                completed_at  TEXT NOT NULL,
                duration_secs INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);",
        )?;
        Ok(())
    }

    /// Append a completed session.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(&self, session: &Session) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sessions (completed_at, duration_secs) VALUES (?1, ?2)",
            params![session.completed_at.to_rfc3339(), session.duration_secs],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Every stored session in insertion order.
    pub fn load_sessions(&self) -> Result<Vec<Session>> {
        let mut stmt = self
            .conn
            .prepare("SELECT completed_at, duration_secs FROM sessions ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (completed_at, duration_secs) = row?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|e| DatabaseError::CorruptRow {
                    table: "sessions".into(),
                    message: format!("bad completed_at '{completed_at}': {e}"),
                })?
                .with_timezone(&Utc);
            sessions.push(Session::new(completed_at, duration_secs));
        }
        Ok(sessions)
    }

    /// Delete every session in one statement. Returns how many were removed.
    pub fn clear_sessions(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM sessions", [])?)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CoreError::from(e)),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// The persisted engine, if one has been saved.
    ///
    /// # Errors
    /// Returns [`CoreError::Json`] if the stored state cannot be decoded.
    pub fn load_engine(&self) -> Result<Option<PomodoroEngine>> {
        match self.kv_get(ENGINE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save_engine(&self, engine: &PomodoroEngine) -> Result<()> {
        let json = serde_json::to_string(engine)?;
        self.kv_set(ENGINE_KEY, &json)
    }

    /// Run `f` holding the database write lock.
    ///
    /// The lock is taken up front (`BEGIN IMMEDIATE`), so a second host
    /// blocks here until the first commits and then reads its result. The
    /// transaction commits if `f` returns `Ok` and rolls back otherwise.
    pub fn immediate_transaction<T, E>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }
}

impl SessionSink for Database {
    fn record(&self, session: &Session) -> Result<()> {
        self.record_session(session).map(|_| ())
    }
}
