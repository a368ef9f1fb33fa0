//! MCP (Model Context Protocol) Server
//!
//! This module implements an MCP server using manual JSON-RPC 2.0 over stdio.
//! We use a direct implementation rather than an MCP-specific crate.
//!
//! # Architecture
//!
//! - **Transport**: JSON-RPC 2.0 over stdio (line-based)
//! - **Dependencies**: Only `serde_json` and anyhow (no MCP-specific crates)
//! - **Protocol**: Implements MCP specification manually
//!
//! # Design Principles
//!
//! 1. **Simple**: Direct JSON-RPC implementation, no macro magic
//! 2. **Debuggable**: Easy to understand and troubleshoot
//! 3. **Reusable**: All tools call existing library functions
//! 4. **Typed failures**: Tool errors carry a stable error code so agents can
//!    branch on NOT_FOUND vs VALIDATION vs INTEGRITY_VIOLATION
//!
//! The server holds the storage root and the prepared-statement registry;
//! everything else is per-call.
//!
//! # Usage
//!
//! Start the server with: `granary serve`
//!
//! Configure in Claude Desktop:
//! ```json
//! {
//!   "mcpServers": {
//!     "granary": {
//!       "command": "granary",
//!       "args": ["serve"]
//!     }
//!   }
//! }
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::catalog;
use crate::csvio;
use crate::error::{GranaryError, Result as GranaryResult};
use crate::exec::{self, BatchQuery, IsolationLevel, Operation};
use crate::schema::DatabaseSchema;
use crate::session::StatementCache;
use crate::store::Store;

// ============================================================================
// JSON-RPC 2.0 Structures
// ============================================================================

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

// ============================================================================
// MCP Tool Result Structures
// ============================================================================

/// Text content block for MCP tool results
#[derive(Debug, Serialize)]
struct TextContent {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

impl TextContent {
    fn new(text: String) -> Self {
        Self { content_type: "text".to_string(), text }
    }
}

/// MCP tool call result
#[derive(Debug, Serialize)]
struct CallToolResult {
    content: Vec<TextContent>,
    #[serde(rename = "isError")]
    is_error: bool,
}

impl CallToolResult {
    /// Create a successful tool result with JSON data
    fn success(data: impl Serialize) -> Result<Value> {
        let json_text = serde_json::to_string_pretty(&data)?;
        let result = Self { content: vec![TextContent::new(json_text)], is_error: false };
        Ok(serde_json::to_value(result)?)
    }

    /// Create a failed tool result carrying the error code and message
    fn failure(error: &GranaryError) -> Result<Value> {
        let payload = serde_json::json!({
            "status": "error",
            "error_code": error.error_code(),
            "message": error.message(),
        });
        let json_text = serde_json::to_string_pretty(&payload)?;
        let result = Self { content: vec![TextContent::new(json_text)], is_error: true };
        Ok(serde_json::to_value(result)?)
    }
}

// ============================================================================
// MCP Server
// ============================================================================

/// Shared state for one server process
pub struct GranaryServer {
    store: Store,
    statements: StatementCache,
}

impl GranaryServer {
    pub fn new(store: Store) -> Self {
        Self { store, statements: StatementCache::new() }
    }
}

/// Start the MCP server
///
/// Runs the main server loop, reading JSON-RPC requests from stdin and
/// writing JSON-RPC responses to stdout. Each request is a single line of
/// JSON; logs go to stderr so stdout stays protocol-clean.
///
/// # Errors
///
/// Returns an error if stdio communication fails.
pub async fn serve(server: GranaryServer) -> Result<()> {
    let stdin = io::stdin();
    let reader = stdin.lock();
    let mut stdout = io::stdout();

    for line in reader.lines() {
        let line = line?;

        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                let error_response = JsonRpcResponse {
                    jsonrpc: "2.0".to_string(),
                    id: None,
                    result: None,
                    error: Some(JsonRpcError {
                        code: -32700, // Parse error
                        message: format!("Parse error: {e}"),
                        data: None,
                    }),
                };
                let response_json = serde_json::to_string(&error_response)?;
                writeln!(stdout, "{response_json}")?;
                stdout.flush()?;
                continue;
            }
        };

        let response = handle_request(&server, request);

        let response_json = serde_json::to_string(&response)?;
        writeln!(stdout, "{response_json}")?;
        stdout.flush()?;
    }

    Ok(())
}

/// Handle a JSON-RPC request
fn handle_request(server: &GranaryServer, request: JsonRpcRequest) -> JsonRpcResponse {
    let result = match request.method.as_str() {
        "initialize" => handle_initialize(request.params),
        "tools/list" => handle_list_tools(),
        "tools/call" => handle_call_tool(server, request.params),
        _ => Err(anyhow!("Unknown method: {}", request.method)),
    };

    match result {
        Ok(value) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: Some(value),
            error: None,
        },
        Err(e) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: None,
            error: Some(JsonRpcError {
                code: -32603, // Internal error
                message: e.to_string(),
                data: None,
            }),
        },
    }
}

// ============================================================================
// MCP Protocol Handlers
// ============================================================================

/// Handle MCP initialize request
fn handle_initialize(_params: Option<Value>) -> Result<Value> {
    Ok(serde_json::json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": "granary",
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

/// Handle tools/list request
///
/// Returns the list of available MCP tools with their schemas.
fn handle_list_tools() -> Result<Value> {
    Ok(serde_json::json!({
        "tools": [
            {
                "name": "usage_guide",
                "description": "START HERE: Returns a short guide to the granary workflow. Call this once at the beginning of a session to learn how databases, schemas, and the batch tools fit together.",
                "inputSchema": { "type": "object", "properties": {} }
            },
            {
                "name": "create_database",
                "description": "Create a new SQLite database from a schema document. EVERY database, table, and column REQUIRES a description of at least 5 characters - this metadata is what makes the database self-documenting for future sessions. The schema is validated before any file is created; a duplicate database name fails with ALREADY_EXISTS. Column 'constraints' is free-form SQL such as 'PRIMARY KEY' or 'NOT NULL UNIQUE'.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string", "description": "Database name. The .db extension is added automatically." },
                        "schema": {
                            "type": "object",
                            "description": "Schema document: {database_description, tables: [{table_name, table_description, columns: [{name, type, description, constraints?}]}]}. All descriptions must be at least 5 characters.",
                            "properties": {
                                "database_description": { "type": "string" },
                                "tables": { "type": "array" }
                            },
                            "required": ["database_description", "tables"]
                        }
                    },
                    "required": ["database_name", "schema"]
                }
            },
            {
                "name": "get_database_info",
                "description": "Get details for one database: description, table list, record counts, file size, timestamps, and the stored schema document with all column descriptions. Call this before querying an unfamiliar database.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string", "description": "Database to inspect" }
                    },
                    "required": ["database_name"]
                }
            },
            {
                "name": "get_table_info",
                "description": "Get details for one table: columns joined with their stored descriptions, record count, and up to 3 sample rows. The fastest way to understand what a table holds.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string" },
                        "table_name": { "type": "string" }
                    },
                    "required": ["database_name", "table_name"]
                }
            },
            {
                "name": "insert_data",
                "description": "Insert one record (object) or many records (array of objects) into a table. All records must share the same column set; the whole insert runs in one transaction, so either every row lands or none do. Constraint failures return INTEGRITY_VIOLATION. For thousands of records prefer bulk_insert.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string" },
                        "table_name": { "type": "string" },
                        "data": { "description": "A JSON object or an array of JSON objects, keyed by column name" }
                    },
                    "required": ["database_name", "table_name", "data"]
                }
            },
            {
                "name": "query_data",
                "description": "Execute one SQL statement. SELECT-style statements return {columns, rows, row_count}; INSERT/UPDATE/DELETE/DDL statements return {affected_rows} and are committed immediately. The statement kind is detected from the leading SQL keyword.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string" },
                        "query": { "type": "string", "description": "SQL statement to execute" }
                    },
                    "required": ["database_name", "query"]
                }
            },
            {
                "name": "get_table_schema",
                "description": "Get the physical column layout of a table via PRAGMA table_info: name, type, not_null, default value, and primary-key flag per column. Use get_table_info instead when you also want descriptions and sample rows.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string" },
                        "table_name": { "type": "string" }
                    },
                    "required": ["database_name", "table_name"]
                }
            },
            {
                "name": "list_databases",
                "description": "List every database in the storage directory with size, timestamps, description, tables, and total record count. A corrupt or unreadable file appears as an entry with an 'error' field rather than failing the listing.",
                "inputSchema": { "type": "object", "properties": {} }
            },
            {
                "name": "delete_database",
                "description": "Delete a database permanently. TWO-STEP SAFETY: call with confirm=false (or omitted) first to receive a summary of what would be deleted, then call again with confirm=true to actually delete. Deletion cannot be undone.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string" },
                        "confirm": { "type": "boolean", "description": "Must be true to actually delete. Default: false (dry run)." }
                    },
                    "required": ["database_name"]
                }
            },
            {
                "name": "create_table_from_csv",
                "description": "Create a NEW table from a CSV file (fails with ALREADY_EXISTS if the table exists). Column types (INTEGER/REAL/TEXT) are inferred from the data; empty cells become NULL. Requires a description of at least 5 characters for the table and for EVERY CSV column. Returns inferred types and up to 10 row-level errors.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string" },
                        "table_name": { "type": "string" },
                        "csv_path": { "type": "string", "description": "Path to the CSV file on the server host" },
                        "table_description": { "type": "string" },
                        "column_descriptions": {
                            "type": "object",
                            "description": "Map of CSV header name to description (each at least 5 characters). Every header must be present."
                        },
                        "primary_key_column": { "type": "string", "description": "Optional: CSV column to declare as PRIMARY KEY" }
                    },
                    "required": ["database_name", "table_name", "csv_path", "table_description", "column_descriptions"]
                }
            },
            {
                "name": "export_table_to_csv",
                "description": "Export a full table to a CSV file with a header row. Refuses to overwrite an existing file (ALREADY_EXISTS); an unwritable target returns PERMISSION_DENIED. NULL values become empty cells.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string" },
                        "table_name": { "type": "string" },
                        "csv_path": { "type": "string", "description": "Target file path. Must not exist yet." }
                    },
                    "required": ["database_name", "table_name", "csv_path"]
                }
            },
            {
                "name": "execute_transaction",
                "description": "Execute multiple operations ATOMICALLY: either every operation commits or none do. Operations run in input order; the first failure rolls the whole transaction back and the report shows which operation failed and why (status='failed', rollback_performed=true). Each operation is an object tagged by 'type': {type:'query'|'update'|'delete', sql, params?} or {type:'insert', table_name, data}. Use this for multi-step changes that must not partially apply, e.g. transfers or linked inserts.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string" },
                        "operations": {
                            "type": "array",
                            "description": "Operations to run in order. Each: {type: 'query'|'insert'|'update'|'delete', ...}. 'insert' takes table_name + data (object or array); the others take sql + optional params.",
                            "items": { "type": "object" }
                        },
                        "isolation_level": {
                            "type": "string",
                            "enum": ["deferred", "immediate", "exclusive"],
                            "description": "SQLite transaction behavior. Default: deferred. Anything else is a VALIDATION error."
                        }
                    },
                    "required": ["database_name", "operations"]
                }
            },
            {
                "name": "bulk_insert",
                "description": "Insert a large record set efficiently in batches. A failed batch is retried record by record, so one bad row costs one row. Returns total/inserted/failed counts (always conserving total = inserted + failed), batches processed, elapsed ms, and up to 50 per-record errors tagged with the record's index in YOUR input array. status is 'success', 'partial_success', or 'failed'.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string" },
                        "table_name": { "type": "string" },
                        "records": {
                            "type": "array",
                            "description": "Array of JSON objects, all with the same column set",
                            "items": { "type": "object" }
                        },
                        "batch_size": { "type": "number", "description": "Records per batch. Default: 100. Must be greater than zero." },
                        "use_transaction": { "type": "boolean", "description": "Wrap each batch in a transaction (default true). false disables explicit transactions entirely and relies on SQLite autocommit." }
                    },
                    "required": ["database_name", "table_name", "records"]
                }
            },
            {
                "name": "prepare_statement",
                "description": "Compile a SQL statement once under a chosen statement_id for repeated execution. Returns the number of positional '?' placeholders. The id stays valid until close_prepared; reusing an id before closing it fails with ALREADY_EXISTS. Each prepared statement holds its own connection.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string" },
                        "statement_id": { "type": "string", "description": "Caller-chosen id, e.g. 'insert_user'" },
                        "sql": { "type": "string", "description": "SQL with positional '?' placeholders" }
                    },
                    "required": ["database_name", "statement_id", "sql"]
                }
            },
            {
                "name": "execute_prepared",
                "description": "Execute a prepared statement with parameter values. The parameter count must match the statement's placeholder count exactly (VALIDATION otherwise); an unknown statement_id is NOT_FOUND. A failed execution leaves the statement open for retry. Result shape matches query_data.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string" },
                        "statement_id": { "type": "string" },
                        "params": {
                            "type": "array",
                            "description": "Positional parameter values, one per '?'. Default: []."
                        }
                    },
                    "required": ["database_name", "statement_id"]
                }
            },
            {
                "name": "close_prepared",
                "description": "Close a prepared statement, freeing its id and connection. Always close statements you are done with.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string" },
                        "statement_id": { "type": "string" }
                    },
                    "required": ["database_name", "statement_id"]
                }
            },
            {
                "name": "execute_batch_queries",
                "description": "Run several independent queries in one call, each tagged with a caller-chosen query_id. Results come back keyed by query_id in input order. Failures are per-query: one bad query does not abort the rest unless fail_fast=true, which stops after recording the first failure. NOT atomic - modifying statements commit as they run; use execute_transaction when you need all-or-nothing.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "database_name": { "type": "string" },
                        "queries": {
                            "type": "array",
                            "description": "Array of {query_id, sql, params?}. query_id values must be unique.",
                            "items": { "type": "object" }
                        },
                        "fail_fast": { "type": "boolean", "description": "Stop after the first failing query. Default: false." }
                    },
                    "required": ["database_name", "queries"]
                }
            }
        ]
    }))
}

/// Handle tools/call request
///
/// Routes the tool call to the appropriate implementation. Domain errors
/// become tool results with isError=true so the agent sees the error code;
/// protocol problems (unknown tool, missing params) stay JSON-RPC errors.
fn handle_call_tool(server: &GranaryServer, params: Option<Value>) -> Result<Value> {
    let params = params.ok_or_else(|| anyhow!("Missing params"))?;
    let name = params["name"].as_str().ok_or_else(|| anyhow!("Missing tool name"))?;
    let arguments = &params["arguments"];

    let outcome = match name {
        "usage_guide" => tool_usage_guide(),
        "create_database" => tool_create_database(server, arguments),
        "get_database_info" => tool_get_database_info(server, arguments),
        "get_table_info" => tool_get_table_info(server, arguments),
        "insert_data" => tool_insert_data(server, arguments),
        "query_data" => tool_query_data(server, arguments),
        "get_table_schema" => tool_get_table_schema(server, arguments),
        "list_databases" => tool_list_databases(server),
        "delete_database" => tool_delete_database(server, arguments),
        "create_table_from_csv" => tool_create_table_from_csv(server, arguments),
        "export_table_to_csv" => tool_export_table_to_csv(server, arguments),
        "execute_transaction" => tool_execute_transaction(server, arguments),
        "bulk_insert" => tool_bulk_insert(server, arguments),
        "prepare_statement" => tool_prepare_statement(server, arguments),
        "execute_prepared" => tool_execute_prepared(server, arguments),
        "close_prepared" => tool_close_prepared(server, arguments),
        "execute_batch_queries" => tool_execute_batch_queries(server, arguments),
        _ => return Err(anyhow!("Unknown tool: {name}")),
    };

    match outcome {
        Ok(payload) => CallToolResult::success(payload),
        Err(e) => CallToolResult::failure(&e),
    }
}

// ============================================================================
// Argument Helpers
// ============================================================================

fn require_str<'a>(args: &'a Value, field: &str) -> GranaryResult<&'a str> {
    args.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| GranaryError::validation(format!("Missing required field: {field}")))
}

fn require_value<'a>(args: &'a Value, field: &str) -> GranaryResult<&'a Value> {
    args.get(field)
        .filter(|v| !v.is_null())
        .ok_or_else(|| GranaryError::validation(format!("Missing required field: {field}")))
}

// ============================================================================
// Tool Implementations
// ============================================================================

fn tool_usage_guide() -> GranaryResult<Value> {
    Ok(serde_json::json!({
        "status": "success",
        "guide": {
            "overview": "granary manages single-file SQLite databases with mandatory descriptions on every database, table, and column. The descriptions are stored inside each database, so any future session can rediscover what the data means.",
            "getting_started": [
                "1. list_databases to see what already exists",
                "2. get_database_info / get_table_info to understand an existing database",
                "3. create_database with a full schema document to start a new one",
                "4. insert_data and query_data for day-to-day work"
            ],
            "batch_tools": {
                "execute_transaction": "Multiple operations, all-or-nothing. Use for linked changes.",
                "bulk_insert": "Thousands of records in batches with per-record error capture.",
                "prepare_statement": "Compile once, execute many times with different params.",
                "execute_batch_queries": "Several independent reads/writes in one call, keyed by query_id."
            },
            "csv": {
                "create_table_from_csv": "Import a CSV into a new table with inferred types.",
                "export_table_to_csv": "Export a table to a new CSV file."
            },
            "error_codes": [
                "NOT_FOUND", "ALREADY_EXISTS", "VALIDATION",
                "INTEGRITY_VIOLATION", "EXECUTION_FAILURE", "PERMISSION_DENIED"
            ],
            "tips": [
                "Descriptions must be at least 5 characters. Write real ones.",
                "delete_database is two-step: dry run first, then confirm=true.",
                "Close prepared statements when you are done with them."
            ]
        }
    }))
}

fn tool_create_database(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let schema_value = require_value(args, "schema")?;
    let schema: DatabaseSchema = serde_json::from_value(schema_value.clone())
        .map_err(|e| GranaryError::validation(format!("Invalid schema document: {e}")))?;

    let result = catalog::create_database(&server.store, name, &schema)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_get_database_info(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let result = catalog::get_database_info(&server.store, name)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_get_table_info(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let table = require_str(args, "table_name")?;
    let result = catalog::get_table_info(&server.store, name, table)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_insert_data(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let table = require_str(args, "table_name")?;
    let data = require_value(args, "data")?;
    let result = catalog::insert_data(&server.store, name, table, data)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_query_data(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let query = require_str(args, "query")?;
    let result = catalog::query_data(&server.store, name, query)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_get_table_schema(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let table = require_str(args, "table_name")?;
    let result = catalog::get_table_schema(&server.store, name, table)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_list_databases(server: &GranaryServer) -> GranaryResult<Value> {
    let result = catalog::list_databases(&server.store)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_delete_database(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let confirm = args.get("confirm").and_then(Value::as_bool).unwrap_or(false);
    let result = catalog::delete_database(&server.store, name, confirm)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_create_table_from_csv(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let table = require_str(args, "table_name")?;
    let csv_path = require_str(args, "csv_path")?;
    let table_description = require_str(args, "table_description")?;
    let descriptions_value = require_value(args, "column_descriptions")?;
    let column_descriptions: HashMap<String, String> =
        serde_json::from_value(descriptions_value.clone()).map_err(|e| {
            GranaryError::validation(format!("column_descriptions must be a string map: {e}"))
        })?;
    let primary_key = args.get("primary_key_column").and_then(|v| v.as_str());

    let result = csvio::create_table_from_csv(
        &server.store,
        name,
        table,
        &PathBuf::from(csv_path),
        table_description,
        &column_descriptions,
        primary_key,
    )?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_export_table_to_csv(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let table = require_str(args, "table_name")?;
    let csv_path = require_str(args, "csv_path")?;
    let result =
        csvio::export_table_to_csv(&server.store, name, table, &PathBuf::from(csv_path))?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_execute_transaction(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let ops_value = require_value(args, "operations")?;
    let operations: Vec<Operation> = serde_json::from_value(ops_value.clone())
        .map_err(|e| GranaryError::validation(format!("Invalid operations: {e}")))?;
    let isolation = match args.get("isolation_level").and_then(|v| v.as_str()) {
        Some(level) => IsolationLevel::parse(level)?,
        None => IsolationLevel::default(),
    };

    let result = exec::execute_transaction(&server.store, name, &operations, isolation)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_bulk_insert(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let table = require_str(args, "table_name")?;
    let records = require_value(args, "records")?
        .as_array()
        .ok_or_else(|| GranaryError::validation("records must be an array"))?;
    let batch_size = match args.get("batch_size") {
        None | Some(Value::Null) => 100,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| GranaryError::validation("batch_size must be a positive integer"))?
            as usize,
    };
    let use_transaction = args.get("use_transaction").and_then(Value::as_bool).unwrap_or(true);

    let result =
        exec::bulk_insert(&server.store, name, table, records, batch_size, use_transaction)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_prepare_statement(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let id = require_str(args, "statement_id")?;
    let sql = require_str(args, "sql")?;
    let result = server.statements.prepare(&server.store, name, id, sql)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_execute_prepared(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let id = require_str(args, "statement_id")?;
    let params: Vec<Value> = match args.get("params") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return Err(GranaryError::validation("params must be an array")),
    };
    let result = server.statements.execute(name, id, &params)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_close_prepared(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let id = require_str(args, "statement_id")?;
    let result = server.statements.close(name, id)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn tool_execute_batch_queries(server: &GranaryServer, args: &Value) -> GranaryResult<Value> {
    let name = require_str(args, "database_name")?;
    let queries_value = require_value(args, "queries")?;
    let queries: Vec<BatchQuery> = serde_json::from_value(queries_value.clone())
        .map_err(|e| GranaryError::validation(format!("Invalid queries: {e}")))?;
    let fail_fast = args.get("fail_fast").and_then(Value::as_bool).unwrap_or(false);

    let result = exec::run_batch(&server.store, name, &queries, fail_fast)?;
    Ok(serde_json::to_value(result).map_err(to_execution_error)?)
}

fn to_execution_error(e: serde_json::Error) -> GranaryError {
    GranaryError::execution(format!("Failed to serialize result: {e}"))
}
