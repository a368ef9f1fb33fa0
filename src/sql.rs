//! Shared SQL Execution Helpers
//!
//! One classifier, one parameter binder, and one statement runner used by
//! every component that touches a connection (catalog helpers, transaction
//! executor, prepared sessions, batch query runner). Keeping the classifier
//! in one place guarantees that all callers agree on what counts as a
//! modifying statement.

use base64::Engine as _;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, Row, Statement};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GranaryError, Result};

/// Broad statement categories recognized by the leading-keyword heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Statement that changes rows or schema; reported as an affected-row count
    Modifying,
    /// Anything else; executed as a query and reported as columns + rows
    Read,
}

/// Classify a statement by its leading keyword.
///
/// Leading whitespace and SQL comments (`--`, `/* */`) are stripped before
/// the keyword is inspected. Only the first keyword is considered; a
/// multi-statement string is classified by its first statement.
#[must_use]
pub fn classify(sql: &str) -> StatementKind {
    let stripped = strip_comments(sql);
    let keyword: String = stripped
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();

    match keyword.as_str() {
        "INSERT" | "UPDATE" | "DELETE" | "ALTER" | "DROP" | "CREATE" => StatementKind::Modifying,
        _ => StatementKind::Read,
    }
}

/// Strip SQL comments from a statement
///
/// Handles line comments (`-- ...`) and block comments (`/* ... */`).
fn strip_comments(sql: &str) -> String {
    let mut result = String::new();
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for ch in chars.by_ref() {
                    if prev == '*' && ch == '/' {
                        break;
                    }
                    prev = ch;
                }
                result.push(' ');
            }
            _ => result.push(ch),
        }
    }

    result
}

/// Quote an identifier for safe interpolation into SQL text.
///
/// Caller-supplied table names cannot be bound as parameters, so they are
/// double-quoted with embedded quotes doubled.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Convert JSON parameters to SQLite values for binding.
///
/// Scalars map directly; arrays and objects are rejected as a validation
/// error since SQLite has no matching type.
pub fn bind_params(params: &[Value]) -> Result<Vec<rusqlite::types::Value>> {
    params.iter().map(json_to_sql).collect()
}

fn json_to_sql(value: &Value) -> Result<rusqlite::types::Value> {
    use rusqlite::types::Value as SqlValue;

    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::Real(f))
            } else {
                Err(GranaryError::validation(format!("Unsupported numeric parameter: {n}")))
            }
        }
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(GranaryError::validation(
            "Parameters must be scalars (null, bool, number, or string)",
        )),
    }
}

/// Result of executing one statement
///
/// Modifying statements report an affected-row count; read statements report
/// columns, rows, and a row count. Serialized flat so callers can embed it
/// directly in their payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlOutcome {
    /// Result set from a read statement
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
        row_count: usize,
    },
    /// Row count from a modifying statement
    Change { affected_rows: usize },
}

/// Execute one statement with bound parameters and classify the outcome.
pub fn execute_statement(conn: &Connection, sql: &str, params: &[Value]) -> Result<SqlOutcome> {
    let mut stmt = conn.prepare(sql)?;
    run_statement(conn, &mut stmt, sql, params)
}

/// Execute an already-prepared statement.
///
/// Used by the prepared-statement sessions, which compile via
/// `prepare_cached` and reuse the compiled form across calls.
pub fn run_statement(
    conn: &Connection,
    stmt: &mut Statement<'_>,
    sql: &str,
    params: &[Value],
) -> Result<SqlOutcome> {
    let bound = bind_params(params)?;

    match classify(sql) {
        StatementKind::Modifying => {
            stmt.execute(params_from_iter(bound.iter()))?;
            Ok(SqlOutcome::Change { affected_rows: conn.changes() as usize })
        }
        StatementKind::Read => {
            let columns: Vec<String> =
                stmt.column_names().iter().map(|s| (*s).to_string()).collect();

            let mut rows_data = Vec::new();
            let mut rows = stmt.query(params_from_iter(bound.iter()))?;
            while let Some(row) = rows.next()? {
                rows_data.push(row_to_json(&columns, row)?);
            }

            let row_count = rows_data.len();
            Ok(SqlOutcome::Rows { columns, rows: rows_data, row_count })
        }
    }
}

/// Convert a SQLite row to a JSON-safe `Vec`
pub fn row_to_json(columns: &[String], row: &Row<'_>) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(columns.len());
    for idx in 0..columns.len() {
        values.push(sqlite_value_to_json(row, idx)?);
    }
    Ok(values)
}

/// Convert one SQLite value to a JSON value
///
/// BLOBs are Base64-encoded for JSON safety; NaN/Infinity become null.
fn sqlite_value_to_json(row: &Row<'_>, idx: usize) -> Result<Value> {
    let value_ref = row.get_ref(idx)?;

    Ok(match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => {
            serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
        }
        ValueRef::Text(s) => {
            let text = std::str::from_utf8(s).map_err(|e| {
                GranaryError::execution(format!("Non-UTF-8 text in column {idx}: {e}"))
            })?;
            Value::String(text.to_string())
        }
        ValueRef::Blob(b) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(b);
            Value::String(encoded)
        }
    })
}
