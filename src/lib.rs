//! Granary - Agent-First SQLite Database Manager
//!
//! Granary is a lightweight database manager designed for autonomous AI coding
//! agents. It manages single-file SQLite databases that carry mandatory
//! human-readable metadata: every database, table, and column has a stored
//! description, so a future session can rediscover what the data means.
//!
//! # Core Principles
//! - Agent-first, machine-only interface (JSON-only output)
//! - Self-documenting data (descriptions are required, not optional)
//! - Explicit over implicit (two-step deletion, typed error codes)
//! - Deterministic behavior (identical inputs → identical outputs)
//!
//! # Architecture
//! This library provides the core functionality for both the CLI and the MCP
//! server. Both interfaces are thin wrappers that call the same internal
//! library functions.
//!
//! # Module Organization
//! - [`error`] - Error types with stable error codes
//! - [`store`] - Storage directory, file naming, and the metadata table
//! - [`schema`] - Schema documents and validation
//! - [`sql`] - Statement classification, parameter binding, JSON bridging
//! - [`catalog`] - Database/table CRUD and introspection
//! - [`exec`] - Transactions, bulk inserts, and batch queries
//! - [`session`] - Prepared-statement sessions
//! - [`csvio`] - CSV import/export
//! - [`mcp`] - MCP server (manual JSON-RPC 2.0 implementation)

pub mod catalog;
pub mod csvio;
pub mod error;
pub mod exec;
pub mod mcp;
pub mod schema;
pub mod session;
pub mod sql;
pub mod store;

// Re-export commonly used types for convenience
pub use catalog::{
    CreateDatabaseResult, DatabaseInfo, DatabaseListing, DeleteOutcome, InsertDataResult,
    QueryDataResult, TableInfoResult, TableSchemaResult,
};
pub use error::{GranaryError, Result};
pub use exec::{
    BatchQuery, BatchQueryReport, BulkInsertReport, IsolationLevel, Operation, RunStatus,
    TransactionReport,
};
pub use mcp::GranaryServer;
pub use schema::{ColumnSchema, DatabaseSchema, TableSchema};
pub use session::StatementCache;
pub use sql::{SqlOutcome, StatementKind};
pub use store::Store;
