//! Bulk Insert Engine
//!
//! Inserts large record sets in contiguous batches. A batch that fails as a
//! unit is retried record by record so one bad row costs one row, not the
//! whole batch.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::catalog;
use crate::error::{GranaryError, Result};
use crate::exec::RunStatus;
use crate::sql;
use crate::store::{self, Store};

/// Cap on the error list so a pathological run stays reportable
const MAX_REPORTED_ERRORS: usize = 50;

/// One failed record, tagged with its index in the original input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordError {
    pub record_index: usize,
    pub error: String,
}

/// Full report for a `bulk_insert` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkInsertReport {
    pub status: RunStatus,
    pub total_records: usize,
    pub inserted_records: usize,
    pub failed_records: usize,
    pub batches_processed: usize,
    pub execution_time_ms: u64,
    pub errors: Vec<RecordError>,
}

/// Progress marker for a batch that did not complete.
///
/// In transactional mode nothing survives the rollback, so both fields are
/// zero. In autocommit mode the rows before the failing record are already
/// durable; they are credited as inserted and the per-record fallback
/// resumes at the failing offset instead of replaying them.
struct BatchFailure {
    committed: usize,
    resume_from: usize,
}

/// Insert records in batches of `batch_size`.
///
/// With `use_transaction` each batch runs inside its own transaction and a
/// failing batch falls back to per-record transactions. Without it no
/// explicit transaction boundaries are used at all and SQLite autocommits
/// each statement.
pub fn bulk_insert(
    store: &Store,
    database: &str,
    table: &str,
    records: &[Value],
    batch_size: usize,
    use_transaction: bool,
) -> Result<BulkInsertReport> {
    if records.is_empty() {
        return Err(GranaryError::validation("records cannot be empty"));
    }
    if batch_size == 0 {
        return Err(GranaryError::validation("batch_size must be greater than zero"));
    }

    // Validate shape before any write. Rows are borrowed, not cloned.
    let rows = object_rows(records)?;
    let columns: Vec<String> = rows[0].keys().cloned().collect();
    for (i, row) in rows.iter().enumerate() {
        if row.len() != columns.len() || !columns.iter().all(|c| row.contains_key(c)) {
            return Err(GranaryError::validation(format!(
                "All records must have the same columns. Record {i} differs from record 0"
            )));
        }
    }

    let mut conn = store.open(database)?;
    if !store::table_exists(&conn, table)? {
        return Err(GranaryError::not_found(format!(
            "Table '{table}' not found in database '{database}'"
        )));
    }

    let insert_sql = catalog::insert_statement(table, &columns);
    let started = Instant::now();

    let mut inserted = 0usize;
    let mut errors: Vec<RecordError> = Vec::new();
    let mut failed = 0usize;
    let mut batches_processed = 0usize;

    for (batch_no, batch) in rows.chunks(batch_size).enumerate() {
        let base_index = batch_no * batch_size;
        let batch_ok = if use_transaction {
            insert_batch_tx(&mut conn, &insert_sql, &columns, batch)
        } else {
            insert_batch_autocommit(&conn, &insert_sql, &columns, batch)
        };

        match batch_ok {
            Ok(count) => inserted += count,
            Err(progress) => {
                inserted += progress.committed;
                // Retry one record at a time so only the bad rows fail.
                // Rows already committed under autocommit are skipped.
                for (offset, row) in batch.iter().enumerate().skip(progress.resume_from) {
                    match insert_one(&mut conn, &insert_sql, &columns, row, use_transaction) {
                        Ok(()) => inserted += 1,
                        Err(e) => {
                            failed += 1;
                            if errors.len() < MAX_REPORTED_ERRORS {
                                errors.push(RecordError {
                                    record_index: base_index + offset,
                                    error: e.message(),
                                });
                            }
                        }
                    }
                }
            }
        }

        batches_processed += 1;
        if batches_processed % 10 == 0 {
            debug!(
                database,
                table,
                batches_processed,
                inserted,
                failed,
                "bulk insert progress"
            );
        }
    }

    let execution_time_ms = started.elapsed().as_millis() as u64;
    let status = RunStatus::from_counts(rows.len(), failed);
    info!(
        database,
        table,
        total = rows.len(),
        inserted,
        failed,
        elapsed_ms = execution_time_ms,
        "bulk insert finished"
    );

    Ok(BulkInsertReport {
        status,
        total_records: rows.len(),
        inserted_records: inserted,
        failed_records: failed,
        batches_processed,
        execution_time_ms,
        errors,
    })
}

/// Borrow a record slice as object rows without cloning the payload
fn object_rows(records: &[Value]) -> Result<Vec<&serde_json::Map<String, Value>>> {
    records
        .iter()
        .map(|item| match item {
            Value::Object(map) if !map.is_empty() => Ok(map),
            Value::Object(_) => Err(GranaryError::validation("Records cannot be empty objects")),
            _ => Err(GranaryError::validation("Each record must be a JSON object")),
        })
        .collect()
}

fn insert_batch_tx(
    conn: &mut rusqlite::Connection,
    insert_sql: &str,
    columns: &[String],
    batch: &[&serde_json::Map<String, Value>],
) -> std::result::Result<usize, BatchFailure> {
    // Any failure rolls the whole batch back when the transaction drops,
    // so the fallback always restarts at record zero
    let all_back = || BatchFailure { committed: 0, resume_from: 0 };

    let tx = conn.transaction().map_err(|_| all_back())?;
    let mut count = 0usize;
    {
        let mut stmt = match tx.prepare_cached(insert_sql) {
            Ok(stmt) => stmt,
            Err(_) => return Err(all_back()),
        };
        for row in batch {
            let bound = match bind_row(columns, row) {
                Ok(bound) => bound,
                Err(_) => return Err(all_back()),
            };
            if stmt.execute(rusqlite::params_from_iter(bound.iter())).is_err() {
                return Err(all_back());
            }
            count += 1;
        }
    }
    tx.commit().map_err(|_| all_back())?;
    Ok(count)
}

fn insert_batch_autocommit(
    conn: &rusqlite::Connection,
    insert_sql: &str,
    columns: &[String],
    batch: &[&serde_json::Map<String, Value>],
) -> std::result::Result<usize, BatchFailure> {
    let mut stmt = match conn.prepare_cached(insert_sql) {
        Ok(stmt) => stmt,
        Err(_) => return Err(BatchFailure { committed: 0, resume_from: 0 }),
    };

    let mut count = 0usize;
    for row in batch {
        // Each statement commits on its own; rows before a failure are
        // durable and must not be replayed by the fallback pass.
        let ok = bind_row(columns, row)
            .and_then(|bound| {
                stmt.execute(rusqlite::params_from_iter(bound.iter()))
                    .map_err(GranaryError::from)
            })
            .is_ok();
        if !ok {
            return Err(BatchFailure { committed: count, resume_from: count });
        }
        count += 1;
    }
    Ok(count)
}

fn insert_one(
    conn: &mut rusqlite::Connection,
    insert_sql: &str,
    columns: &[String],
    row: &serde_json::Map<String, Value>,
    use_transaction: bool,
) -> Result<()> {
    let bound = bind_row(columns, row)?;
    if use_transaction {
        let tx = conn.transaction().map_err(GranaryError::from)?;
        tx.prepare_cached(insert_sql)?
            .execute(rusqlite::params_from_iter(bound.iter()))?;
        tx.commit().map_err(GranaryError::from)?;
    } else {
        conn.prepare_cached(insert_sql)?
            .execute(rusqlite::params_from_iter(bound.iter()))?;
    }
    Ok(())
}

fn bind_row(
    columns: &[String],
    row: &serde_json::Map<String, Value>,
) -> Result<Vec<rusqlite::types::Value>> {
    let values: Vec<Value> = columns
        .iter()
        .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
        .collect();
    sql::bind_params(&values)
}
