//! Prepared Statement Sessions
//!
//! A [`StatementCache`] holds named prepared-statement sessions, each with
//! its own dedicated connection that lives until the session is closed.
//! Registry access is serialized by a mutex; the lock is held for the whole
//! execute call, so a session cannot be closed out from under a running
//! statement.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{GranaryError, Result};
use crate::sql::{self, SqlOutcome};
use crate::store::Store;

struct PreparedSession {
    database: String,
    sql: String,
    parameter_count: usize,
    conn: rusqlite::Connection,
}

/// Named prepared-statement registry
#[derive(Default)]
pub struct StatementCache {
    sessions: Mutex<HashMap<String, PreparedSession>>,
}

/// Result of a successful `prepare`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareResult {
    pub status: String,
    pub statement_id: String,
    pub parameter_count: usize,
    pub database_name: String,
    pub sql: String,
}

/// Result of a successful `execute`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResult {
    pub status: String,
    pub statement_id: String,
    #[serde(flatten)]
    pub outcome: SqlOutcome,
}

/// Acknowledgement of a `close`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseResult {
    pub status: String,
    pub statement_id: String,
    pub message: String,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a statement under `id` with a dedicated connection.
    ///
    /// The SQL is compiled once here to validate it and to count its
    /// positional placeholders; later executions reuse the compiled form
    /// through the connection's statement cache.
    pub fn prepare(&self, store: &Store, database: &str, id: &str, sql_text: &str) -> Result<PrepareResult> {
        if sql_text.trim().is_empty() {
            return Err(GranaryError::validation("sql cannot be empty"));
        }

        let mut sessions = self.sessions.lock().expect("statement registry poisoned");
        if sessions.contains_key(id) {
            return Err(GranaryError::already_exists(format!(
                "Statement '{id}' already exists. Close it first or choose another id"
            )));
        }

        let conn = store.open(database)?;
        let parameter_count = {
            let stmt = conn.prepare_cached(sql_text)?;
            stmt.parameter_count()
        };

        sessions.insert(
            id.to_string(),
            PreparedSession {
                database: database.to_string(),
                sql: sql_text.to_string(),
                parameter_count,
                conn,
            },
        );
        info!(database, statement_id = id, parameter_count, "prepared statement");

        Ok(PrepareResult {
            status: "success".into(),
            statement_id: id.to_string(),
            parameter_count,
            database_name: database.to_string(),
            sql: sql_text.to_string(),
        })
    }

    /// Execute a previously prepared statement with the given parameters.
    ///
    /// Database and arity are checked before the connection is touched. A
    /// failing execution rolls back any open transaction on the session
    /// connection but leaves the session registered.
    pub fn execute(&self, database: &str, id: &str, params: &[Value]) -> Result<ExecuteResult> {
        let mut sessions = self.sessions.lock().expect("statement registry poisoned");
        let session = sessions.get_mut(id).ok_or_else(|| {
            GranaryError::not_found(format!("Statement '{id}' not found"))
        })?;

        if session.database != database {
            return Err(GranaryError::validation(format!(
                "Statement '{id}' was prepared for database '{}', not '{database}'",
                session.database
            )));
        }
        if params.len() != session.parameter_count {
            return Err(GranaryError::validation(format!(
                "Statement '{id}' expects {} parameter(s), got {}",
                session.parameter_count,
                params.len()
            )));
        }

        debug!(statement_id = id, params = params.len(), "executing prepared statement");
        let sql_text = session.sql.clone();
        let result = run_prepared(&session.conn, &sql_text, params);

        match result {
            Ok(outcome) => Ok(ExecuteResult {
                status: "success".into(),
                statement_id: id.to_string(),
                outcome,
            }),
            Err(e) => {
                if !session.conn.is_autocommit() {
                    let _ = session.conn.execute_batch("ROLLBACK");
                }
                Err(e)
            }
        }
    }

    /// Remove a session and drop its connection
    pub fn close(&self, database: &str, id: &str) -> Result<CloseResult> {
        let mut sessions = self.sessions.lock().expect("statement registry poisoned");
        let session = sessions
            .get(id)
            .ok_or_else(|| GranaryError::not_found(format!("Statement '{id}' not found")))?;
        if session.database != database {
            return Err(GranaryError::validation(format!(
                "Statement '{id}' was prepared for database '{}', not '{database}'",
                session.database
            )));
        }

        sessions.remove(id);
        info!(database, statement_id = id, "closed prepared statement");
        Ok(CloseResult {
            status: "success".into(),
            statement_id: id.to_string(),
            message: format!("Statement '{id}' closed"),
        })
    }

    /// Number of open sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().expect("statement registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn run_prepared(conn: &rusqlite::Connection, sql_text: &str, params: &[Value]) -> Result<SqlOutcome> {
    let mut stmt = conn.prepare_cached(sql_text)?;
    sql::run_statement(conn, &mut stmt, sql_text, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store() -> Store {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let thread_id = std::thread::current().id();
        let dir = std::env::temp_dir().join(format!("granary_session_{thread_id:?}_{id}"));
        let _ = std::fs::remove_dir_all(&dir);
        Store::new(dir)
    }

    fn fixture(store: &Store) {
        let conn = store.create("notes").unwrap();
        conn.execute(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL)",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_prepare_counts_placeholders() {
        let store = temp_store();
        fixture(&store);
        let cache = StatementCache::new();

        let result = cache
            .prepare(&store, "notes", "ins", "INSERT INTO notes (id, body) VALUES (?, ?)")
            .unwrap();
        assert_eq!(result.parameter_count, 2);
        assert_eq!(result.database_name, "notes");
        assert_eq!(cache.len(), 1);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let store = temp_store();
        fixture(&store);
        let cache = StatementCache::new();

        cache.prepare(&store, "notes", "s1", "SELECT * FROM notes").unwrap();
        let err = cache.prepare(&store, "notes", "s1", "SELECT 1").unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_EXISTS");

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_prepare_invalid_sql_fails() {
        let store = temp_store();
        fixture(&store);
        let cache = StatementCache::new();

        let err = cache.prepare(&store, "notes", "bad", "SELECT * FROM no_table").unwrap_err();
        assert_eq!(err.error_code(), "EXECUTION_FAILURE");
        assert!(cache.is_empty());

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_execute_repeatedly() {
        let store = temp_store();
        fixture(&store);
        let cache = StatementCache::new();

        cache
            .prepare(&store, "notes", "ins", "INSERT INTO notes (id, body) VALUES (?, ?)")
            .unwrap();
        for i in 1..=3 {
            let result = cache
                .execute("notes", "ins", &[json!(i), json!(format!("note {i}"))])
                .unwrap();
            assert!(matches!(result.outcome, SqlOutcome::Change { affected_rows: 1 }));
        }

        cache.prepare(&store, "notes", "all", "SELECT body FROM notes ORDER BY id").unwrap();
        let result = cache.execute("notes", "all", &[]).unwrap();
        match result.outcome {
            SqlOutcome::Rows { row_count, .. } => assert_eq!(row_count, 3),
            SqlOutcome::Change { .. } => panic!("expected rows"),
        }

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_arity_and_database_checked_first() {
        let store = temp_store();
        fixture(&store);
        let cache = StatementCache::new();

        cache
            .prepare(&store, "notes", "ins", "INSERT INTO notes (id, body) VALUES (?, ?)")
            .unwrap();

        let err = cache.execute("notes", "ins", &[json!(1)]).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION");

        let err = cache.execute("other", "ins", &[json!(1), json!("x")]).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION");

        let err = cache.execute("notes", "ghost", &[]).unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_session_survives_execution_failure() {
        let store = temp_store();
        fixture(&store);
        let cache = StatementCache::new();

        cache
            .prepare(&store, "notes", "ins", "INSERT INTO notes (id, body) VALUES (?, ?)")
            .unwrap();
        cache.execute("notes", "ins", &[json!(1), json!("first")]).unwrap();

        // duplicate primary key
        let err = cache.execute("notes", "ins", &[json!(1), json!("dup")]).unwrap_err();
        assert_eq!(err.error_code(), "INTEGRITY_VIOLATION");

        // still usable afterwards
        let result = cache.execute("notes", "ins", &[json!(2), json!("second")]).unwrap();
        assert!(matches!(result.outcome, SqlOutcome::Change { affected_rows: 1 }));

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_close_frees_id_for_reuse() {
        let store = temp_store();
        fixture(&store);
        let cache = StatementCache::new();

        cache.prepare(&store, "notes", "s", "SELECT 1").unwrap();
        let ack = cache.close("notes", "s").unwrap();
        assert_eq!(ack.statement_id, "s");
        assert!(cache.is_empty());

        let err = cache.close("notes", "s").unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        // id is free again
        cache.prepare(&store, "notes", "s", "SELECT 2").unwrap();
        assert_eq!(cache.len(), 1);

        let _ = std::fs::remove_dir_all(store.root());
    }
}
