//! Reserved Metadata Table
//!
//! Each database carries one `_metadata` table of key/value pairs with
//! created/updated timestamps. Entries are upserted, never deleted; the
//! whole set disappears only when the owning database file is removed.
//!
//! Well-known keys: `database_description`, `schema` (full schema JSON),
//! `tables` (JSON array of table names).

use std::collections::HashMap;

use chrono::Local;
use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

/// Name of the reserved metadata table
pub const METADATA_TABLE: &str = "_metadata";

/// Key holding the overall database description
pub const KEY_DESCRIPTION: &str = "database_description";

/// Key holding the serialized schema document
pub const KEY_SCHEMA: &str = "schema";

/// Key holding the JSON array of table names
pub const KEY_TABLES: &str = "tables";

/// Create the metadata table if it doesn't exist
pub fn ensure_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _metadata (
            key TEXT PRIMARY KEY,
            value TEXT,
            created_at TEXT,
            updated_at TEXT
        )",
        [],
    )?;
    Ok(())
}

/// Insert or update one metadata entry.
///
/// Updates keep the original `created_at` and refresh `updated_at`.
pub fn upsert(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let now = Local::now().to_rfc3339();

    let existing: Option<String> = conn
        .query_row("SELECT created_at FROM _metadata WHERE key = ?", [key], |row| row.get(0))
        .optional()?;

    if existing.is_some() {
        conn.execute(
            "UPDATE _metadata SET value = ?, updated_at = ? WHERE key = ?",
            [value, now.as_str(), key],
        )?;
    } else {
        conn.execute(
            "INSERT INTO _metadata (key, value, created_at, updated_at) VALUES (?, ?, ?, ?)",
            [key, value, now.as_str(), now.as_str()],
        )?;
    }

    Ok(())
}

/// Fetch one metadata value
pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM _metadata WHERE key = ?", [key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

/// Fetch all metadata entries as a key/value map.
///
/// Returns an empty map when the table doesn't exist, so callers can read
/// databases created outside Granary.
pub fn all(conn: &Connection) -> Result<HashMap<String, String>> {
    if !crate::store::table_exists(conn, METADATA_TABLE)? {
        return Ok(HashMap::new());
    }

    let mut stmt = conn.prepare("SELECT key, value FROM _metadata")?;
    let entries = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;
    Ok(entries)
}
