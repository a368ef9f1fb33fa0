//! Batch Query Runner
//!
//! Runs a list of independent queries on one shared connection, keyed by a
//! caller-chosen query_id. Failures are absorbed per query unless fail_fast
//! stops the run at the first one.

use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{GranaryError, Result};
use crate::exec::RunStatus;
use crate::sql;
use crate::store::Store;

/// One query in a batch request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchQuery {
    pub query_id: String,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// Full report for a `run_batch` call.
///
/// `results` is keyed by query_id in input order; with fail_fast the queries
/// after the first failure are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchQueryReport {
    pub status: RunStatus,
    pub results: serde_json::Map<String, Value>,
    pub total_queries: usize,
    pub successful_queries: usize,
    pub failed_queries: usize,
    pub execution_time_ms: u64,
}

/// Run all queries on one connection.
pub fn run_batch(
    store: &Store,
    database: &str,
    queries: &[BatchQuery],
    fail_fast: bool,
) -> Result<BatchQueryReport> {
    if queries.is_empty() {
        return Err(GranaryError::validation("queries cannot be empty"));
    }

    let mut seen = HashSet::new();
    for q in queries {
        if !seen.insert(q.query_id.as_str()) {
            return Err(GranaryError::validation(format!(
                "Duplicate query_id '{}'",
                q.query_id
            )));
        }
    }

    let conn = store.open(database)?;
    let started = Instant::now();
    debug!(database, queries = queries.len(), fail_fast, "running query batch");

    let mut results = serde_json::Map::new();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for query in queries {
        let outcome = match query.sql.as_deref().map(str::trim) {
            None | Some("") => Err(GranaryError::validation("Query is missing sql")),
            Some(text) => sql::execute_statement(&conn, text, &query.params),
        };

        match outcome {
            Ok(data) => {
                successful += 1;
                results.insert(
                    query.query_id.clone(),
                    serde_json::json!({
                        "status": "success",
                        "data": data,
                    }),
                );
            }
            Err(e) => {
                failed += 1;
                results.insert(
                    query.query_id.clone(),
                    serde_json::json!({
                        "status": "failed",
                        "error": e.message(),
                    }),
                );
                if fail_fast {
                    break;
                }
            }
        }
    }

    let execution_time_ms = started.elapsed().as_millis() as u64;
    let status = RunStatus::from_counts(successful + failed, failed);
    info!(
        database,
        total = queries.len(),
        successful,
        failed,
        elapsed_ms = execution_time_ms,
        "query batch finished"
    );

    Ok(BatchQueryReport {
        status,
        results,
        total_queries: queries.len(),
        successful_queries: successful,
        failed_queries: failed,
        execution_time_ms,
    })
}
