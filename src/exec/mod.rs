//! Batched Execution
//!
//! Three executors share this module: atomic multi-operation transactions,
//! chunked bulk inserts with per-record fallback, and a multi-query runner.
//! All three report an aggregate [`RunStatus`].

pub mod batch;
pub mod bulk;
pub mod transaction;

pub use batch::{run_batch, BatchQuery, BatchQueryReport};
pub use bulk::{bulk_insert, BulkInsertReport, RecordError};
pub use transaction::{
    execute_transaction, IsolationLevel, Operation, OperationResult, TransactionReport,
};

use serde::{Deserialize, Serialize};

/// Aggregate outcome of a multi-item run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialSuccess,
    Failed,
}

impl RunStatus {
    /// Classify a run from its failure count
    pub fn from_counts(total: usize, failed: usize) -> Self {
        if failed == 0 {
            RunStatus::Success
        } else if failed < total {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Failed
        }
    }
}
