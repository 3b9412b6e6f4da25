//! SQLite schema for the subscriber database.

use anyhow::Result;
use rusqlite::Connection;

/// Current schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

const CREATE_SUBSCRIBERS_TABLE: &str = "CREATE TABLE subscribers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

// The UNIQUE index is the durable form of the one-record-per-email invariant;
// the handler-level duplicate check only exists to produce a friendly 409.
const CREATE_EMAIL_INDEX: &str =
    "CREATE UNIQUE INDEX idx_subscribers_email ON subscribers(email)";

/// Create the latest schema on a fresh database.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_SUBSCRIBERS_TABLE, [])?;
    conn.execute(CREATE_EMAIL_INDEX, [])?;
    conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
    Ok(())
}

/// Validate that an existing database has the expected structure.
pub fn validate_schema(conn: &Connection) -> Result<()> {
    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='subscribers'",
        [],
        |row| row.get(0),
    )?;
    if table_count != 1 {
        anyhow::bail!("Subscriber database is missing the subscribers table");
    }

    let index_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name='idx_subscribers_email'",
        [],
        |row| row.get(0),
    )?;
    if index_count != 1 {
        anyhow::bail!("Subscriber database is missing the unique email index");
    }

    Ok(())
}

/// Migration function type: runs inside the caller's transaction.
pub type MigrationFn = fn(&Connection) -> Result<()>;

/// Ordered migrations from each schema version to the next.
/// Version 1 is the baseline, so the list is empty for now.
pub const MIGRATIONS: &[(i64, MigrationFn)] = &[];
