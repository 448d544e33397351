//! SQLite set store
//!
//! This module provides the durable backend for the frontier.

use crate::frontier::schema::initialize_schema;
use crate::frontier::traits::{FrontierError, FrontierResult, SetStore};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed set store
pub struct SqliteSetStore {
    conn: Mutex<Connection>,
}

impl SqliteSetStore {
    /// Opens or creates a set store database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSetStore)` - Successfully opened/created database
    /// * `Err(FrontierError)` - Failed to open database
    pub fn new(path: &Path) -> FrontierResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> FrontierResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> FrontierResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FrontierError::LockPoisoned(e.to_string()))
    }
}

impl SetStore for SqliteSetStore {
    fn set_add(&self, set: &str, member: &str) -> FrontierResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn()?.execute(
            "INSERT OR IGNORE INTO set_members (set_name, member, added_at) VALUES (?1, ?2, ?3)",
            params![set, member, now],
        )?;
        Ok(inserted > 0)
    }

    fn set_remove(&self, set: &str, member: &str) -> FrontierResult<bool> {
        let removed = self.conn()?.execute(
            "DELETE FROM set_members WHERE set_name = ?1 AND member = ?2",
            params![set, member],
        )?;
        Ok(removed > 0)
    }

    fn set_scan(&self, set: &str, cursor: u64, count: usize) -> FrontierResult<(u64, Vec<String>)> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, member FROM set_members
             WHERE set_name = ?1 AND id > ?2
             ORDER BY id ASC
             LIMIT ?3",
        )?;

        let rows = stmt
            .query_map(params![set, cursor as i64, count as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let next = match rows.last() {
            Some((id, _)) if rows.len() == count => *id as u64,
            _ => 0,
        };
        Ok((next, rows.into_iter().map(|(_, member)| member).collect()))
    }
}
