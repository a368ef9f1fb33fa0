//! Atomic Multi-Operation Transactions
//!
//! Runs a list of operations inside a single SQLite transaction. The first
//! failure aborts the remainder and rolls everything back; success commits
//! once at the end.

use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog;
use crate::error::{GranaryError, Result};
use crate::sql::{self, SqlOutcome};
use crate::store::{self, Store};

/// One operation in a transaction request.
///
/// The kind tag selects the variant; required fields are enforced by
/// deserialization, so a malformed operation never reaches the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Query {
        sql: String,
        #[serde(default)]
        params: Vec<Value>,
    },
    Insert {
        table_name: String,
        data: Value,
    },
    Update {
        sql: String,
        #[serde(default)]
        params: Vec<Value>,
    },
    Delete {
        sql: String,
        #[serde(default)]
        params: Vec<Value>,
    },
}

impl Operation {
    fn kind(&self) -> &'static str {
        match self {
            Operation::Query { .. } => "query",
            Operation::Insert { .. } => "insert",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
        }
    }
}

/// SQLite transaction behavior selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationLevel {
    Deferred,
    Immediate,
    Exclusive,
}

impl Default for IsolationLevel {
    fn default() -> Self {
        IsolationLevel::Deferred
    }
}

impl IsolationLevel {
    fn behavior(self) -> TransactionBehavior {
        match self {
            IsolationLevel::Deferred => TransactionBehavior::Deferred,
            IsolationLevel::Immediate => TransactionBehavior::Immediate,
            IsolationLevel::Exclusive => TransactionBehavior::Exclusive,
        }
    }

    /// Parse a user-supplied level name; unknown names are rejected
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "deferred" => Ok(IsolationLevel::Deferred),
            "immediate" => Ok(IsolationLevel::Immediate),
            "exclusive" => Ok(IsolationLevel::Exclusive),
            other => Err(GranaryError::validation(format!(
                "Unknown isolation level '{other}'. Expected deferred, immediate, or exclusive"
            ))),
        }
    }
}

/// Result of one operation within a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationResult {
    Completed {
        operation_index: usize,
        operation_type: String,
        #[serde(flatten)]
        outcome: SqlOutcome,
    },
    Error {
        operation_index: usize,
        operation_type: String,
        error: String,
    },
}

/// Full report for an `execute_transaction` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionReport {
    pub status: String,
    pub transaction_id: String,
    pub operations_executed: usize,
    pub results: Vec<OperationResult>,
    pub rollback_performed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Execute all operations atomically.
///
/// Operations run in input order on one connection. On the first failure the
/// transaction rolls back and the report carries the partial results,
/// including an error entry for the failing operation.
pub fn execute_transaction(
    store: &Store,
    database: &str,
    operations: &[Operation],
    isolation: IsolationLevel,
) -> Result<TransactionReport> {
    if operations.is_empty() {
        return Err(GranaryError::validation("operations cannot be empty"));
    }

    let transaction_id = Uuid::new_v4().to_string();
    let mut conn = store.open(database)?;
    debug!(
        database,
        transaction_id = %transaction_id,
        operations = operations.len(),
        "starting transaction"
    );

    let tx = conn
        .transaction_with_behavior(isolation.behavior())
        .map_err(GranaryError::from)?;

    let mut results = Vec::with_capacity(operations.len());

    for (index, op) in operations.iter().enumerate() {
        match apply_operation(&tx, op) {
            Ok(outcome) => results.push(OperationResult::Completed {
                operation_index: index,
                operation_type: op.kind().to_string(),
                outcome,
            }),
            Err(e) => {
                let message = e.message();
                results.push(OperationResult::Error {
                    operation_index: index,
                    operation_type: op.kind().to_string(),
                    error: message.clone(),
                });
                // The report with partial results must reach the caller even
                // if the explicit rollback errors; dropping the transaction
                // rolls back regardless.
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        database,
                        transaction_id = %transaction_id,
                        error = %rollback_err,
                        "rollback reported an error"
                    );
                }
                warn!(
                    database,
                    transaction_id = %transaction_id,
                    failed_at = index,
                    error = %message,
                    "transaction rolled back"
                );
                return Ok(TransactionReport {
                    status: "failed".into(),
                    transaction_id,
                    operations_executed: index,
                    results,
                    rollback_performed: true,
                    error_message: Some(format!("Operation {index} failed: {message}")),
                });
            }
        }
    }

    tx.commit().map_err(GranaryError::from)?;
    info!(
        database,
        transaction_id = %transaction_id,
        operations = operations.len(),
        "transaction committed"
    );

    Ok(TransactionReport {
        status: "success".into(),
        transaction_id,
        operations_executed: operations.len(),
        results,
        rollback_performed: false,
        error_message: None,
    })
}

fn apply_operation(conn: &rusqlite::Connection, op: &Operation) -> Result<SqlOutcome> {
    match op {
        Operation::Query { sql, params }
        | Operation::Update { sql, params }
        | Operation::Delete { sql, params } => sql::execute_statement(conn, sql, params),
        Operation::Insert { table_name, data } => {
            if !store::table_exists(conn, table_name)? {
                return Err(GranaryError::not_found(format!(
                    "Table '{table_name}' not found"
                )));
            }
            let rows = catalog::normalize_rows(data)?;
            let columns: Vec<String> = rows[0].keys().cloned().collect();
            let insert_sql = catalog::insert_statement(table_name, &columns);
            let mut affected = 0usize;
            for row in &rows {
                let values: Vec<Value> = columns
                    .iter()
                    .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                    .collect();
                let bound = sql::bind_params(&values)?;
                affected += conn.execute(&insert_sql, rusqlite::params_from_iter(bound.iter()))?;
            }
            Ok(SqlOutcome::Change { affected_rows: affected })
        }
    }
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
        let dir = std::env::temp_dir().join(format!("granary_tx_{thread_id:?}_{id}"));
        let _ = std::fs::remove_dir_all(&dir);
        Store::new(dir)
    }

    fn fixture(store: &Store) {
        let conn = store.create("ledger").unwrap();
        conn.execute(
            "CREATE TABLE accounts (id INTEGER PRIMARY KEY, name TEXT NOT NULL, balance REAL)",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO accounts VALUES (1, 'alice', 100.0)", []).unwrap();
        conn.execute("INSERT INTO accounts VALUES (2, 'bob', 50.0)", []).unwrap();
    }

    #[test]
    fn test_commit_on_success() {
        let store = temp_store();
        fixture(&store);

        let ops: Vec<Operation> = serde_json::from_value(json!([
            {"type": "update", "sql": "UPDATE accounts SET balance = balance - 10 WHERE id = 1"},
            {"type": "update", "sql": "UPDATE accounts SET balance = balance + 10 WHERE id = 2"},
            {"type": "query", "sql": "SELECT balance FROM accounts ORDER BY id"}
        ]))
        .unwrap();

        let report =
            execute_transaction(&store, "ledger", &ops, IsolationLevel::Deferred).unwrap();
        assert_eq!(report.status, "success");
        assert_eq!(report.operations_executed, 3);
        assert!(!report.rollback_performed);
        assert_eq!(report.results.len(), 3);

        match &report.results[2] {
            OperationResult::Completed { outcome: SqlOutcome::Rows { rows, .. }, .. } => {
                assert_eq!(rows[0][0], json!(90.0));
                assert_eq!(rows[1][0], json!(60.0));
            }
            other => panic!("expected rows, got {other:?}"),
        }

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_rollback_on_failure_restores_state() {
        let store = temp_store();
        fixture(&store);

        let ops: Vec<Operation> = serde_json::from_value(json!([
            {"type": "update", "sql": "UPDATE accounts SET balance = 0 WHERE id = 1"},
            // duplicate primary key forces a constraint failure
            {"type": "insert", "table_name": "accounts",
             "data": {"id": 1, "name": "dup", "balance": 0}},
            {"type": "delete", "sql": "DELETE FROM accounts"}
        ]))
        .unwrap();

        let report =
            execute_transaction(&store, "ledger", &ops, IsolationLevel::Deferred).unwrap();
        assert_eq!(report.status, "failed");
        assert!(report.rollback_performed);
        assert_eq!(report.operations_executed, 1);
        assert_eq!(report.results.len(), 2);
        assert!(report.error_message.as_deref().unwrap().contains("Operation 1 failed"));
        assert!(matches!(report.results[1], OperationResult::Error { .. }));

        // first update was rolled back
        let balance: f64 = store
            .open("ledger")
            .unwrap()
            .query_row("SELECT balance FROM accounts WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(balance, 100.0);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_failure_returns_report_not_error() {
        let store = temp_store();
        fixture(&store);

        // a failing operation must surface as a failed report with the
        // partial results attached, never as a call-level error
        let ops: Vec<Operation> = serde_json::from_value(json!([
            {"type": "query", "sql": "SELECT count(*) FROM accounts"},
            {"type": "update", "sql": "UPDATE nowhere SET x = 1"}
        ]))
        .unwrap();

        let outcome = execute_transaction(&store, "ledger", &ops, IsolationLevel::Deferred);
        let report = outcome.expect("failed transactions still produce a report");
        assert_eq!(report.status, "failed");
        assert!(report.rollback_performed);
        assert_eq!(report.results.len(), 2);
        assert!(matches!(report.results[0], OperationResult::Completed { .. }));
        assert!(matches!(report.results[1], OperationResult::Error { .. }));

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_empty_operations_rejected() {
        let store = temp_store();
        fixture(&store);

        let err = execute_transaction(&store, "ledger", &[], IsolationLevel::Deferred)
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION");

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_missing_database_not_found() {
        let store = temp_store();
        let ops: Vec<Operation> =
            serde_json::from_value(json!([{"type": "query", "sql": "SELECT 1"}])).unwrap();
        let err =
            execute_transaction(&store, "ghost", &ops, IsolationLevel::Immediate).unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_isolation_level_parse() {
        assert_eq!(IsolationLevel::parse("IMMEDIATE").unwrap(), IsolationLevel::Immediate);
        assert_eq!(IsolationLevel::parse("deferred").unwrap(), IsolationLevel::Deferred);
        let err = IsolationLevel::parse("serializable").unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION");
    }

    #[test]
    fn test_operation_deserialization_rejects_missing_fields() {
        let result: std::result::Result<Operation, _> =
            serde_json::from_value(json!({"type": "insert", "table_name": "t"}));
        assert!(result.is_err());

        let result: std::result::Result<Operation, _> =
            serde_json::from_value(json!({"type": "teleport", "sql": "SELECT 1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_insert_operation_multi_row() {
        let store = temp_store();
        fixture(&store);

        let ops: Vec<Operation> = serde_json::from_value(json!([
            {"type": "insert", "table_name": "accounts",
             "data": [
                {"id": 3, "name": "carol", "balance": 5.0},
                {"id": 4, "name": "dave", "balance": 6.0}
             ]}
        ]))
        .unwrap();

        let report =
            execute_transaction(&store, "ledger", &ops, IsolationLevel::Exclusive).unwrap();
        assert_eq!(report.status, "success");
        match &report.results[0] {
            OperationResult::Completed { outcome: SqlOutcome::Change { affected_rows }, .. } => {
                assert_eq!(*affected_rows, 2);
            }
            other => panic!("expected change, got {other:?}"),
        }

        let _ = std::fs::remove_dir_all(store.root());
    }
}
