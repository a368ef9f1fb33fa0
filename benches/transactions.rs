//! Transaction Executor Performance Benchmarks
//!
//! Measures atomic multi-operation execution across isolation levels and the
//! cost of a rollback.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use granary::exec::{self, IsolationLevel, Operation};
use granary::Store;

fn bench_store(label: &str) -> Store {
    let dir = std::env::temp_dir().join(format!("granary_bench_tx_{label}"));
    let _ = std::fs::remove_dir_all(&dir);
    let store = Store::new(dir);
    let conn = store.create("bench").expect("Failed to create database");
    conn.execute(
        "CREATE TABLE counters (name TEXT PRIMARY KEY, value INTEGER NOT NULL)",
        [],
    )
    .expect("Failed to create table");
    conn.execute("INSERT INTO counters VALUES ('hits', 0)", []).expect("Failed to seed");
    store
}

fn bump_ops(n: usize) -> Vec<Operation> {
    let ops: Vec<serde_json::Value> = (0..n)
        .map(|_| json!({"type": "update", "sql": "UPDATE counters SET value = value + 1 WHERE name = 'hits'"}))
        .collect();
    serde_json::from_value(serde_json::Value::Array(ops)).expect("valid operations")
}

fn bench_transaction_10_updates(c: &mut Criterion) {
    let store = bench_store("u10");
    let ops = bump_ops(10);

    c.bench_function("transaction_10_updates_deferred", |b| {
        b.iter(|| {
            let report = exec::execute_transaction(
                black_box(&store),
                "bench",
                black_box(&ops),
                IsolationLevel::Deferred,
            )
            .expect("transaction failed");
            assert_eq!(report.status, "success");
            report
        });
    });

    let _ = std::fs::remove_dir_all(store.root());
}

fn bench_transaction_immediate(c: &mut Criterion) {
    let store = bench_store("imm");
    let ops = bump_ops(10);

    c.bench_function("transaction_10_updates_immediate", |b| {
        b.iter(|| {
            let report = exec::execute_transaction(
                black_box(&store),
                "bench",
                black_box(&ops),
                IsolationLevel::Immediate,
            )
            .expect("transaction failed");
            assert_eq!(report.status, "success");
            report
        });
    });

    let _ = std::fs::remove_dir_all(store.root());
}

fn bench_transaction_rollback(c: &mut Criterion) {
    let store = bench_store("rb");
    let ops: Vec<Operation> = serde_json::from_value(json!([
        {"type": "update", "sql": "UPDATE counters SET value = value + 1 WHERE name = 'hits'"},
        {"type": "query", "sql": "SELECT * FROM missing_table"}
    ]))
    .expect("valid operations");

    c.bench_function("transaction_rollback", |b| {
        b.iter(|| {
            let report = exec::execute_transaction(
                black_box(&store),
                "bench",
                black_box(&ops),
                IsolationLevel::Deferred,
            )
            .expect("executor should absorb the failure");
            assert!(report.rollback_performed);
            report
        });
    });

    let _ = std::fs::remove_dir_all(store.root());
}

criterion_group!(
    benches,
    bench_transaction_10_updates,
    bench_transaction_immediate,
    bench_transaction_rollback
);
criterion_main!(benches);
