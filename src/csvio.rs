//! CSV Import and Export
//!
//! Import creates a brand-new table from a CSV file, inferring INTEGER, REAL,
//! or TEXT per column from the data. Export writes a table to a CSV file and
//! refuses to overwrite an existing one.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{GranaryError, Result};
use crate::schema::{ColumnSchema, DatabaseSchema, TableSchema, MIN_DESCRIPTION_LEN};
use crate::sql::{self, quote_ident, SqlOutcome};
use crate::store::{self, metadata, Store};

const MAX_REPORTED_ERRORS: usize = 10;

/// One rejected CSV row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub error: String,
}

/// Result of `create_table_from_csv`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvImportReport {
    pub status: String,
    pub database_name: String,
    pub table_name: String,
    pub total_rows: usize,
    pub inserted_rows: usize,
    pub error_rows: usize,
    pub errors: Vec<RowError>,
    pub inferred_types: HashMap<String, String>,
}

/// Result of `export_table_to_csv`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvExportReport {
    pub status: String,
    pub database_name: String,
    pub table_name: String,
    pub csv_path: String,
    pub exported_rows: usize,
    pub exported_columns: usize,
}

/// Create a new table from a CSV file.
///
/// The table must not exist yet. Every CSV column needs a description of at
/// least [`MIN_DESCRIPTION_LEN`] characters; column types are inferred from
/// the data and empty cells become NULL. The new table is merged into the
/// stored schema document.
pub fn create_table_from_csv(
    store: &Store,
    database: &str,
    table: &str,
    csv_path: &Path,
    table_description: &str,
    column_descriptions: &HashMap<String, String>,
    primary_key_column: Option<&str>,
) -> Result<CsvImportReport> {
    if table_description.trim().len() < MIN_DESCRIPTION_LEN {
        return Err(GranaryError::validation(format!(
            "table_description must be at least {MIN_DESCRIPTION_LEN} characters"
        )));
    }

    let mut conn = store.open(database)?;
    if store::table_exists(&conn, table)? {
        return Err(GranaryError::already_exists(format!(
            "Table '{table}' already exists in database '{database}'"
        )));
    }

    let mut reader = csv::Reader::from_path(csv_path).map_err(csv_error)?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().any(|h| h.is_empty()) {
        return Err(GranaryError::validation("CSV file must have a non-empty header row"));
    }

    for header in &headers {
        match column_descriptions.get(header) {
            Some(d) if d.trim().len() >= MIN_DESCRIPTION_LEN => {}
            Some(_) => {
                return Err(GranaryError::validation(format!(
                    "Description for column '{header}' must be at least {MIN_DESCRIPTION_LEN} characters"
                )))
            }
            None => {
                return Err(GranaryError::validation(format!(
                    "Missing description for column '{header}'"
                )))
            }
        }
    }

    if let Some(pk) = primary_key_column {
        if !headers.iter().any(|h| h == pk) {
            return Err(GranaryError::validation(format!(
                "primary_key_column '{pk}' is not a CSV column"
            )));
        }
    }

    let mut records: Vec<csv::StringRecord> = Vec::new();
    for record in reader.records() {
        records.push(record.map_err(csv_error)?);
    }

    let types = infer_types(&headers, &records);

    let column_defs: Vec<String> = headers
        .iter()
        .map(|h| {
            let mut def = format!("{} {}", quote_ident(h), types[h]);
            if primary_key_column == Some(h.as_str()) {
                def.push_str(" PRIMARY KEY");
            }
            def
        })
        .collect();
    let create_sql = format!("CREATE TABLE {} ({})", quote_ident(table), column_defs.join(", "));

    let insert_sql = {
        let placeholders: Vec<&str> = headers.iter().map(|_| "?").collect();
        let names: Vec<String> = headers.iter().map(|h| quote_ident(h)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            names.join(", "),
            placeholders.join(", ")
        )
    };

    let tx = conn.transaction().map_err(GranaryError::from)?;
    tx.execute(&create_sql, [])?;

    let mut inserted = 0usize;
    let mut errors: Vec<RowError> = Vec::new();
    {
        let mut stmt = tx.prepare(&insert_sql)?;
        for (row_no, record) in records.iter().enumerate() {
            match bind_record(&headers, &types, record) {
                Ok(bound) => match stmt.execute(rusqlite::params_from_iter(bound.iter())) {
                    Ok(_) => inserted += 1,
                    Err(e) => push_row_error(&mut errors, row_no, e.to_string()),
                },
                Err(e) => push_row_error(&mut errors, row_no, e.message()),
            }
        }
    }
    tx.commit().map_err(GranaryError::from)?;

    let error_rows = records.len() - inserted;
    merge_schema_metadata(&conn, table, table_description, &headers, &types, column_descriptions)?;
    info!(
        database,
        table,
        total = records.len(),
        inserted,
        error_rows,
        "csv import finished"
    );

    Ok(CsvImportReport {
        status: "success".into(),
        database_name: database.to_string(),
        table_name: table.to_string(),
        total_rows: records.len(),
        inserted_rows: inserted,
        error_rows,
        errors,
        inferred_types: types,
    })
}

fn push_row_error(errors: &mut Vec<RowError>, row: usize, error: String) {
    if errors.len() < MAX_REPORTED_ERRORS {
        errors.push(RowError { row, error });
    }
}

fn csv_error(e: csv::Error) -> GranaryError {
    match e.kind() {
        csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
            GranaryError::not_found(format!("CSV file not found: {e}"))
        }
        csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
            GranaryError::permission_denied(format!("CSV file not accessible: {e}"))
        }
        _ => GranaryError::validation(format!("CSV parse error: {e}")),
    }
}

/// Infer a SQLite type per column. A column is INTEGER if every non-empty
/// value parses as an integer, REAL if every non-empty value parses as a
/// number, otherwise TEXT. All-empty columns default to TEXT.
fn infer_types(headers: &[String], records: &[csv::StringRecord]) -> HashMap<String, String> {
    let mut types = HashMap::new();

    for (idx, header) in headers.iter().enumerate() {
        let mut any_value = false;
        let mut all_int = true;
        let mut all_real = true;

        for record in records {
            let cell = record.get(idx).unwrap_or("").trim();
            if cell.is_empty() {
                continue;
            }
            any_value = true;
            if cell.parse::<i64>().is_err() {
                all_int = false;
            }
            if cell.parse::<f64>().is_err() {
                all_real = false;
            }
        }

        let inferred = if !any_value {
            "TEXT"
        } else if all_int {
            "INTEGER"
        } else if all_real {
            "REAL"
        } else {
            "TEXT"
        };
        types.insert(header.clone(), inferred.to_string());
    }

    types
}

fn bind_record(
    headers: &[String],
    types: &HashMap<String, String>,
    record: &csv::StringRecord,
) -> Result<Vec<rusqlite::types::Value>> {
    if record.len() != headers.len() {
        return Err(GranaryError::validation(format!(
            "Expected {} field(s), found {}",
            headers.len(),
            record.len()
        )));
    }

    let mut values = Vec::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        let cell = record.get(idx).unwrap_or("").trim();
        if cell.is_empty() {
            values.push(rusqlite::types::Value::Null);
            continue;
        }
        let value = match types[header].as_str() {
            "INTEGER" => cell
                .parse::<i64>()
                .map(rusqlite::types::Value::Integer)
                .map_err(|_| GranaryError::validation(format!("'{cell}' is not an integer")))?,
            "REAL" => cell
                .parse::<f64>()
                .map(rusqlite::types::Value::Real)
                .map_err(|_| GranaryError::validation(format!("'{cell}' is not a number")))?,
            _ => rusqlite::types::Value::Text(cell.to_string()),
        };
        values.push(value);
    }
    Ok(values)
}

fn merge_schema_metadata(
    conn: &rusqlite::Connection,
    table: &str,
    table_description: &str,
    headers: &[String],
    types: &HashMap<String, String>,
    column_descriptions: &HashMap<String, String>,
) -> Result<()> {
    metadata::ensure_table(conn)?;

    let table_schema = TableSchema {
        table_name: table.to_string(),
        table_description: table_description.to_string(),
        columns: headers
            .iter()
            .map(|h| ColumnSchema {
                name: h.clone(),
                column_type: types[h].clone(),
                description: column_descriptions.get(h).cloned().unwrap_or_default(),
                constraints: None,
            })
            .collect(),
    };

    if let Some(text) = metadata::get(conn, metadata::KEY_SCHEMA)? {
        if let Ok(mut schema) = serde_json::from_str::<DatabaseSchema>(&text) {
            schema.tables.retain(|t| t.table_name != table);
            schema.tables.push(table_schema);
            metadata::upsert(
                conn,
                metadata::KEY_SCHEMA,
                &serde_json::to_string(&schema).unwrap_or_default(),
            )?;
        }
    }

    let tables = store::user_tables(conn)?;
    metadata::upsert(
        conn,
        metadata::KEY_TABLES,
        &serde_json::to_string(&tables).unwrap_or_default(),
    )?;
    Ok(())
}

/// Export a table to a CSV file, header row included.
///
/// Refuses to overwrite an existing file.
pub fn export_table_to_csv(
    store: &Store,
    database: &str,
    table: &str,
    csv_path: &Path,
) -> Result<CsvExportReport> {
    let conn = store.open(database)?;
    if !store::table_exists(&conn, table)? {
        return Err(GranaryError::not_found(format!(
            "Table '{table}' not found in database '{database}'"
        )));
    }

    if csv_path.exists() {
        return Err(GranaryError::already_exists(format!(
            "File '{}' already exists",
            csv_path.display()
        )));
    }

    let outcome = sql::execute_statement(
        &conn,
        &format!("SELECT * FROM {}", quote_ident(table)),
        &[],
    )?;
    let (columns, rows) = match outcome {
        SqlOutcome::Rows { columns, rows, .. } => (columns, rows),
        SqlOutcome::Change { .. } => (Vec::new(), Vec::new()),
    };

    let mut writer = csv::Writer::from_path(csv_path).map_err(csv_error)?;
    writer.write_record(&columns).map_err(csv_error)?;
    for row in &rows {
        let fields: Vec<String> = row.iter().map(cell_to_string).collect();
        writer.write_record(&fields).map_err(csv_error)?;
    }
    writer.flush().map_err(GranaryError::from)?;

    info!(database, table, rows = rows.len(), path = %csv_path.display(), "csv export finished");
    Ok(CsvExportReport {
        status: "success".into(),
        database_name: database.to_string(),
        table_name: table.to_string(),
        csv_path: csv_path.display().to_string(),
        exported_rows: rows.len(),
        exported_columns: columns.len(),
    })
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
