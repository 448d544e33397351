//! Database schema for the durable frontier

/// SQL schema for the set store
///
/// Members are kept per named set. The rowid doubles as the scan cursor, so
/// a scan picks up where it left off even while members are added.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS set_members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    set_name TEXT NOT NULL,
    member TEXT NOT NULL,
    added_at TEXT NOT NULL,
    UNIQUE(set_name, member)
);

CREATE INDEX IF NOT EXISTS idx_set_members_set ON set_members(set_name, id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
