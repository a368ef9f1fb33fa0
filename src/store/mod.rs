//! Single-File Database Store
//!
//! The store owns one fixed directory of `*.db` files and resolves database
//! names to paths inside it. Every open returns a fresh [`rusqlite::Connection`];
//! nothing here holds a connection across calls.
//!
//! # Resolution order for the data directory
//! 1. Explicit path (`--data-dir` flag)
//! 2. `GRANARY_DATA_DIR` environment variable
//! 3. Platform data dir (`~/.local/share/granary/databases` on Linux)
//! 4. `./databases` as a last resort

pub mod metadata;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};

use crate::error::{GranaryError, Result};

/// File extension appended to database names when missing
pub const DB_EXTENSION: &str = "db";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "GRANARY_DATA_DIR";

/// Handle to the fixed storage directory
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

/// Filesystem stats for one database file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbFileStat {
    /// File name including the `.db` extension
    pub file_name: String,
    /// File size in megabytes, rounded to two decimals
    pub size_mb: f64,
    /// Creation timestamp (falls back to modification time where unsupported)
    pub created_at: String,
    /// Last modification timestamp
    pub updated_at: String,
}

impl Store {
    /// Create a store rooted at an explicit directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the storage directory from flag, environment, or platform default
    #[must_use]
    pub fn resolve(data_dir: Option<PathBuf>) -> Self {
        let root = data_dir
            .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
            .or_else(|| dirs::data_local_dir().map(|d| d.join("granary").join("databases")))
            .unwrap_or_else(|| PathBuf::from("databases"));
        Self::new(root)
    }

    /// Storage directory root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a database name to its file path, appending `.db` when missing.
    ///
    /// Names containing path separators or `..` are rejected so callers cannot
    /// escape the storage directory.
    pub fn db_path(&self, name: &str) -> Result<PathBuf> {
        if name.trim().is_empty() {
            return Err(GranaryError::validation("Database name cannot be empty"));
        }
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(GranaryError::validation(format!(
                "Invalid database name '{name}': path separators are not allowed"
            )));
        }

        let file_name = if Path::new(name).extension().is_some_and(|e| e == DB_EXTENSION) {
            name.to_string()
        } else {
            format!("{name}.{DB_EXTENSION}")
        };

        Ok(self.root.join(file_name))
    }

    /// Check whether a database file exists
    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.db_path(name)?.exists())
    }

    /// Open an existing database; `NotFound` if the file is absent.
    pub fn open(&self, name: &str) -> Result<Connection> {
        let path = self.db_path(name)?;
        if !path.exists() {
            return Err(GranaryError::not_found(format!(
                "Database '{name}' not found. Create it first with create_database."
            )));
        }

        Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_WRITE)
            .map_err(GranaryError::from)
    }

    /// Create and open a new database; `AlreadyExists` if the file is present.
    pub fn create(&self, name: &str) -> Result<Connection> {
        let path = self.db_path(name)?;
        if path.exists() {
            return Err(GranaryError::already_exists(format!(
                "Database '{name}' already exists at {}. Use a different name or add data to the existing database.",
                path.display()
            )));
        }

        std::fs::create_dir_all(&self.root)?;
        Connection::open(&path).map_err(GranaryError::from)
    }

    /// Delete a database file. Irreversible.
    pub fn delete(&self, name: &str) -> Result<PathBuf> {
        let path = self.db_path(name)?;
        if !path.exists() {
            return Err(GranaryError::not_found(format!("Database '{name}' not found")));
        }
        std::fs::remove_file(&path)?;
        Ok(path)
    }

    /// Filesystem stats for one database
    pub fn file_stat(&self, name: &str) -> Result<DbFileStat> {
        let path = self.db_path(name)?;
        let meta = std::fs::metadata(&path)?;
        Ok(stat_from_metadata(&path, &meta))
    }

    /// List every `*.db` file in the storage directory, sorted by name.
    ///
    /// A missing directory is an empty listing, not an error.
    pub fn list_files(&self) -> Result<Vec<DbFileStat>> {
        let mut stats = Vec::new();

        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|e| e == DB_EXTENSION) {
                let meta = entry.metadata()?;
                stats.push(stat_from_metadata(&path, &meta));
            }
        }

        stats.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(stats)
    }
}

/// Check whether a table exists in an open database
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// User table names, excluding SQLite internals and the metadata table
pub fn user_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != ?
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([metadata::METADATA_TABLE], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(names)
}

fn stat_from_metadata(path: &Path, meta: &std::fs::Metadata) -> DbFileStat {
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let created = meta.created().unwrap_or(modified);

    DbFileStat {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size_mb: round_mb(meta.len()),
        created_at: to_iso(created),
        updated_at: to_iso(modified),
    }
}

fn round_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

fn to_iso(time: SystemTime) -> String {
    DateTime::<Local>::from(time).to_rfc3339()
}
