//! Executor Integration Tests
//!
//! Covers the three batch executors working against real database files:
//! atomic transactions, bulk inserts with fallback, and the batch query
//! runner.

use pretty_assertions::assert_eq;
use serde_json::json;

use granary::exec::{self, BatchQuery, IsolationLevel, Operation, OperationResult};
use granary::{RunStatus, SqlOutcome, Store};

// ============================================================================
// Test Helpers
// ============================================================================

fn temp_store() -> Store {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let thread_id = std::thread::current().id();
    let dir = std::env::temp_dir().join(format!("granary_exec_it_{thread_id:?}_{id}"));
    let _ = std::fs::remove_dir_all(&dir);
    Store::new(dir)
}

fn orders_fixture(store: &Store) {
    let conn = store.create("shop").unwrap();
    conn.execute(
        "CREATE TABLE orders (
            id INTEGER PRIMARY KEY,
            customer TEXT NOT NULL,
            total REAL NOT NULL
        )",
        [],
    )
    .unwrap();
    conn.execute(
        "CREATE TABLE stock (sku TEXT PRIMARY KEY, qty INTEGER NOT NULL CHECK (qty >= 0))",
        [],
    )
    .unwrap();
    conn.execute("INSERT INTO stock VALUES ('WIDGET', 10)", []).unwrap();
}

fn row_count(store: &Store, table: &str) -> i64 {
    store
        .open("shop")
        .unwrap()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .unwrap()
}

// ============================================================================
// Transactions
// ============================================================================

#[test]
fn test_transaction_order_and_stock_commit_together() {
    let store = temp_store();
    orders_fixture(&store);

    let ops: Vec<Operation> = serde_json::from_value(json!([
        {"type": "insert", "table_name": "orders",
         "data": {"id": 1, "customer": "ada", "total": 19.99}},
        {"type": "update", "sql": "UPDATE stock SET qty = qty - 1 WHERE sku = 'WIDGET'"},
        {"type": "query", "sql": "SELECT qty FROM stock WHERE sku = 'WIDGET'"}
    ]))
    .unwrap();

    let report =
        exec::execute_transaction(&store, "shop", &ops, IsolationLevel::Immediate).unwrap();
    assert_eq!(report.status, "success");
    assert_eq!(report.operations_executed, 3);
    assert!(!report.rollback_performed);
    assert!(report.error_message.is_none());

    // uuid format sanity
    assert_eq!(report.transaction_id.len(), 36);

    match &report.results[2] {
        OperationResult::Completed { outcome: SqlOutcome::Rows { rows, .. }, .. } => {
            assert_eq!(rows[0][0], json!(9));
        }
        other => panic!("expected rows, got {other:?}"),
    }

    assert_eq!(row_count(&store, "orders"), 1);
    let _ = std::fs::remove_dir_all(store.root());
}

#[test]
fn test_transaction_failure_leaves_no_trace() {
    let store = temp_store();
    orders_fixture(&store);

    let ops: Vec<Operation> = serde_json::from_value(json!([
        {"type": "insert", "table_name": "orders",
         "data": {"id": 1, "customer": "ada", "total": 19.99}},
        // drives qty below the CHECK constraint
        {"type": "update", "sql": "UPDATE stock SET qty = qty - 100 WHERE sku = 'WIDGET'"},
        {"type": "delete", "sql": "DELETE FROM stock"}
    ]))
    .unwrap();

    let report =
        exec::execute_transaction(&store, "shop", &ops, IsolationLevel::Deferred).unwrap();
    assert_eq!(report.status, "failed");
    assert!(report.rollback_performed);
    assert_eq!(report.operations_executed, 1);
    // partial results include the failing operation's error entry
    assert_eq!(report.results.len(), 2);
    assert!(matches!(report.results[1], OperationResult::Error { .. }));

    // nothing committed
    assert_eq!(row_count(&store, "orders"), 0);
    let qty: i64 = store
        .open("shop")
        .unwrap()
        .query_row("SELECT qty FROM stock WHERE sku = 'WIDGET'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(qty, 10);

    let _ = std::fs::remove_dir_all(store.root());
}

#[test]
fn test_transaction_ids_are_unique() {
    let store = temp_store();
    orders_fixture(&store);

    let ops: Vec<Operation> =
        serde_json::from_value(json!([{"type": "query", "sql": "SELECT 1"}])).unwrap();
    let a = exec::execute_transaction(&store, "shop", &ops, IsolationLevel::Deferred).unwrap();
    let b = exec::execute_transaction(&store, "shop", &ops, IsolationLevel::Deferred).unwrap();
    assert_ne!(a.transaction_id, b.transaction_id);

    let _ = std::fs::remove_dir_all(store.root());
}

// ============================================================================
// Bulk Insert
// ============================================================================

#[test]
fn test_bulk_insert_large_batch_counts() {
    let store = temp_store();
    orders_fixture(&store);

    let records: Vec<serde_json::Value> = (0..250)
        .map(|i| json!({"id": i + 1, "customer": format!("c{i}"), "total": i as f64}))
        .collect();

    let report = exec::bulk_insert(&store, "shop", "orders", &records, 64, true).unwrap();
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.total_records, 250);
    assert_eq!(report.inserted_records, 250);
    assert_eq!(report.batches_processed, 4); // 64+64+64+58
    assert_eq!(row_count(&store, "orders"), 250);

    let _ = std::fs::remove_dir_all(store.root());
}

#[test]
fn test_bulk_insert_conservation_with_failures() {
    let store = temp_store();
    orders_fixture(&store);

    let mut records: Vec<serde_json::Value> = (0..30)
        .map(|i| json!({"id": i + 1, "customer": format!("c{i}"), "total": 1.0}))
        .collect();
    // three duplicate ids scattered across batches
    records[5] = json!({"id": 1, "customer": "dup", "total": 1.0});
    records[14] = json!({"id": 2, "customer": "dup", "total": 1.0});
    records[29] = json!({"id": 3, "customer": "dup", "total": 1.0});

    let report = exec::bulk_insert(&store, "shop", "orders", &records, 10, true).unwrap();
    assert_eq!(report.status, RunStatus::PartialSuccess);
    assert_eq!(report.inserted_records + report.failed_records, report.total_records);
    assert_eq!(report.failed_records, 3);

    let indices: Vec<usize> = report.errors.iter().map(|e| e.record_index).collect();
    assert_eq!(indices, vec![5, 14, 29]);

    assert_eq!(row_count(&store, "orders"), 27);
    let _ = std::fs::remove_dir_all(store.root());
}

// ============================================================================
// Batch Queries
// ============================================================================

#[test]
fn test_batch_queries_mixed_reads_and_writes() {
    let store = temp_store();
    orders_fixture(&store);

    let queries = vec![
        BatchQuery {
            query_id: "seed".into(),
            sql: Some("INSERT INTO orders (id, customer, total) VALUES (1, 'ada', 5.0)".into()),
            params: vec![],
        },
        BatchQuery {
            query_id: "check".into(),
            sql: Some("SELECT COUNT(*) AS n FROM orders".into()),
            params: vec![],
        },
        BatchQuery {
            query_id: "broken".into(),
            sql: Some("SELECT * FROM missing_table".into()),
            params: vec![],
        },
    ];

    let report = exec::run_batch(&store, "shop", &queries, false).unwrap();
    assert_eq!(report.status, RunStatus::PartialSuccess);
    assert_eq!(report.total_queries, 3);
    assert_eq!(report.successful_queries, 2);
    assert_eq!(report.failed_queries, 1);

    let keys: Vec<&String> = report.results.keys().collect();
    assert_eq!(keys, vec!["seed", "check", "broken"]);
    assert_eq!(report.results["check"]["data"]["rows"][0][0], json!(1));

    // the write committed even though a later query failed
    assert_eq!(row_count(&store, "orders"), 1);
    let _ = std::fs::remove_dir_all(store.root());
}

#[test]
fn test_batch_queries_fail_fast_truncates_results() {
    let store = temp_store();
    orders_fixture(&store);

    let queries = vec![
        BatchQuery { query_id: "ok".into(), sql: Some("SELECT 1 AS one".into()), params: vec![] },
        BatchQuery { query_id: "bad".into(), sql: Some("SELECT * FROM nope".into()), params: vec![] },
        BatchQuery { query_id: "after".into(), sql: Some("SELECT 2".into()), params: vec![] },
    ];

    let report = exec::run_batch(&store, "shop", &queries, true).unwrap();
    assert_eq!(report.results.len(), 2);
    assert!(report.results.contains_key("ok"));
    assert!(report.results.contains_key("bad"));
    assert!(!report.results.contains_key("after"));
    assert_eq!(report.status, RunStatus::PartialSuccess);

    let _ = std::fs::remove_dir_all(store.root());
}
