//! Database Catalog Operations
//!
//! Create/list/inspect/delete databases and the plain insert/query helpers.
//! Each function opens a fresh connection through the [`Store`], does its
//! work, and drops the connection on return.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{GranaryError, Result};
use crate::schema::DatabaseSchema;
use crate::sql::{self, quote_ident, SqlOutcome};
use crate::store::{self, metadata, Store};

/// Result of a successful `create_database`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDatabaseResult {
    pub status: String,
    pub message: String,
    pub db_path: String,
    pub tables: Vec<String>,
}

/// Result of `insert_data`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertDataResult {
    pub status: String,
    pub rows_inserted: usize,
    pub table_name: String,
    pub database: String,
}

/// Result of `query_data`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryDataResult {
    pub status: String,
    #[serde(flatten)]
    pub outcome: SqlOutcome,
}

/// One column as reported by `PRAGMA table_info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDetail {
    pub column_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
}

/// Result of `get_table_schema`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchemaResult {
    pub status: String,
    pub database: String,
    pub table_name: String,
    pub columns: Vec<ColumnDetail>,
}

/// Summary entry for one database in a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSummary {
    pub database_name: String,
    pub size_mb: f64,
    pub created_at: String,
    pub updated_at: String,
    pub description: String,
    pub tables: Vec<String>,
    pub table_count: usize,
    pub total_records: u64,
}

/// A listing entry: either a readable summary or an error marker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatabaseEntry {
    Summary(DatabaseSummary),
    Unreadable { database_name: String, error: String },
}

/// Result of `list_databases`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseListing {
    pub status: String,
    pub database_count: usize,
    pub databases: Vec<DatabaseEntry>,
}

/// Result of `get_database_info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub status: String,
    pub database_name: String,
    pub database_description: String,
    pub tables: Vec<String>,
    pub table_count: usize,
    pub total_records: u64,
    pub size_mb: f64,
    pub created_at: String,
    pub updated_at: String,
    pub schema: Option<DatabaseSchema>,
}

/// One column in `get_table_info`, joined with its stored description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribedColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
    pub description: String,
}

/// Result of `get_table_info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfoResult {
    pub status: String,
    pub database_name: String,
    pub table_name: String,
    pub table_description: String,
    pub columns: Vec<DescribedColumn>,
    pub record_count: u64,
    pub sample_data: Vec<serde_json::Map<String, Value>>,
}

/// Condensed database facts shown before deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseBrief {
    pub database_name: String,
    pub tables: Vec<String>,
    pub table_count: usize,
    pub total_records: u64,
    pub size_mb: f64,
}

/// Two-step deletion outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeleteOutcome {
    ConfirmationRequired {
        status: String,
        message: String,
        database_info: DatabaseBrief,
    },
    Deleted {
        status: String,
        message: String,
        deleted_file: String,
        deleted_info: DatabaseBrief,
    },
}

/// Create a new database from a validated schema document.
///
/// The schema is validated before the file is created; if table creation
/// fails partway, the file is removed so a retry starts clean.
pub fn create_database(
    store: &Store,
    name: &str,
    schema: &DatabaseSchema,
) -> Result<CreateDatabaseResult> {
    schema.validate()?;

    let conn = store.create(name)?;
    info!(database = name, tables = schema.tables.len(), "creating database");

    let created = build_tables(&conn, schema);
    match created {
        Ok(tables) => {
            let path = store.db_path(name)?;
            Ok(CreateDatabaseResult {
                status: "success".into(),
                message: format!(
                    "Database '{name}' created successfully with {} table(s)",
                    tables.len()
                ),
                db_path: path.display().to_string(),
                tables,
            })
        }
        Err(e) => {
            drop(conn);
            if let Ok(path) = store.db_path(name) {
                let _ = std::fs::remove_file(path);
            }
            warn!(database = name, error = %e, "database creation failed, file removed");
            Err(e)
        }
    }
}

fn build_tables(conn: &rusqlite::Connection, schema: &DatabaseSchema) -> Result<Vec<String>> {
    metadata::ensure_table(conn)?;
    metadata::upsert(conn, metadata::KEY_DESCRIPTION, &schema.database_description)?;
    metadata::upsert(conn, metadata::KEY_SCHEMA, &serde_json::to_string(schema).unwrap_or_default())?;
    metadata::upsert(
        conn,
        metadata::KEY_TABLES,
        &serde_json::to_string(&schema.table_names()).unwrap_or_default(),
    )?;

    let mut created = Vec::new();
    for table in &schema.tables {
        conn.execute(&table.create_sql(), [])?;
        created.push(table.table_name.clone());
    }
    Ok(created)
}

/// Insert one record or a list of records into a table.
///
/// All records must share the same column set; the check runs before any
/// row is written, and the whole insert is one transaction.
pub fn insert_data(
    store: &Store,
    database: &str,
    table: &str,
    data: &Value,
) -> Result<InsertDataResult> {
    let rows = normalize_rows(data)?;
    let mut conn = store.open(database)?;

    if !store::table_exists(&conn, table)? {
        return Err(GranaryError::not_found(format!(
            "Table '{table}' not found in database '{database}'"
        )));
    }

    let columns: Vec<String> = rows[0].keys().cloned().collect();
    for (i, row) in rows.iter().enumerate() {
        let keys: Vec<&String> = row.keys().collect();
        if keys.len() != columns.len() || !columns.iter().all(|c| row.contains_key(c)) {
            return Err(GranaryError::validation(format!(
                "All data rows must have the same columns. Expected {columns:?}, row {i} has {keys:?}"
            )));
        }
    }

    let insert_sql = insert_statement(table, &columns);
    let tx = conn.transaction().map_err(GranaryError::from)?;
    {
        let mut stmt = tx.prepare(&insert_sql)?;
        for row in &rows {
            let values: Vec<Value> = columns.iter().map(|c| row[c].clone()).collect();
            let bound = sql::bind_params(&values)?;
            stmt.execute(rusqlite::params_from_iter(bound.iter()))?;
        }
    }
    tx.commit().map_err(GranaryError::from)?;

    info!(database, table, rows = rows.len(), "inserted rows");
    Ok(InsertDataResult {
        status: "success".into(),
        rows_inserted: rows.len(),
        table_name: table.to_string(),
        database: database.to_string(),
    })
}

/// Build a parameterized INSERT for the given column set
pub(crate) fn insert_statement(table: &str, columns: &[String]) -> String {
    let column_names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        column_names.join(", "),
        placeholders.join(", ")
    )
}

/// Normalize a JSON payload (object or array of objects) to a row list
pub(crate) fn normalize_rows(data: &Value) -> Result<Vec<serde_json::Map<String, Value>>> {
    let rows: Vec<serde_json::Map<String, Value>> = match data {
        Value::Object(map) => vec![map.clone()],
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map.clone()),
                _ => Err(GranaryError::validation("Each record must be a JSON object")),
            })
            .collect::<Result<_>>()?,
        _ => {
            return Err(GranaryError::validation(
                "data must be an object or a list of objects",
            ))
        }
    };

    if rows.is_empty() {
        return Err(GranaryError::validation("data cannot be empty"));
    }
    if rows.iter().any(|r| r.is_empty()) {
        return Err(GranaryError::validation("Records cannot be empty objects"));
    }

    Ok(rows)
}

/// Execute one SQL statement against a database.
///
/// Read statements return columns/rows; modifying statements return the
/// affected-row count and are committed immediately.
pub fn query_data(store: &Store, database: &str, sql_text: &str) -> Result<QueryDataResult> {
    if sql_text.trim().is_empty() {
        return Err(GranaryError::validation("Query cannot be empty"));
    }

    let conn = store.open(database)?;
    let outcome = sql::execute_statement(&conn, sql_text, &[])?;
    Ok(QueryDataResult { status: "success".into(), outcome })
}

/// Column layout of one table via `PRAGMA table_info`
pub fn get_table_schema(store: &Store, database: &str, table: &str) -> Result<TableSchemaResult> {
    let conn = store.open(database)?;
    let columns = pragma_columns(&conn, table)?;

    if columns.is_empty() {
        return Err(GranaryError::not_found(format!(
            "Table '{table}' not found in database '{database}'"
        )));
    }

    Ok(TableSchemaResult {
        status: "success".into(),
        database: database.to_string(),
        table_name: table.to_string(),
        columns,
    })
}

fn pragma_columns(conn: &rusqlite::Connection, table: &str) -> Result<Vec<ColumnDetail>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnDetail {
                column_id: row.get(0)?,
                name: row.get(1)?,
                column_type: row.get(2)?,
                not_null: row.get::<_, i32>(3)? != 0,
                default_value: row.get(4)?,
                is_primary_key: row.get::<_, i32>(5)? > 0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// List every database in the store with summary facts.
///
/// A database that cannot be opened is reported as an error entry instead of
/// failing the whole listing.
pub fn list_databases(store: &Store) -> Result<DatabaseListing> {
    let mut databases = Vec::new();

    for stat in store.list_files()? {
        match summarize(store, &stat.file_name) {
            Ok(mut summary) => {
                summary.size_mb = stat.size_mb;
                summary.created_at = stat.created_at.clone();
                summary.updated_at = stat.updated_at.clone();
                databases.push(DatabaseEntry::Summary(summary));
            }
            Err(e) => {
                warn!(database = %stat.file_name, error = %e, "unreadable database in listing");
                databases.push(DatabaseEntry::Unreadable {
                    database_name: stat.file_name.clone(),
                    error: e.message(),
                });
            }
        }
    }

    Ok(DatabaseListing {
        status: "success".into(),
        database_count: databases.len(),
        databases,
    })
}

fn summarize(store: &Store, name: &str) -> Result<DatabaseSummary> {
    let conn = store.open(name)?;
    let meta = metadata::all(&conn)?;
    let tables = store::user_tables(&conn)?;
    let total_records = count_all_rows(&conn, &tables)?;

    Ok(DatabaseSummary {
        database_name: name.to_string(),
        size_mb: 0.0,
        created_at: String::new(),
        updated_at: String::new(),
        description: meta.get(metadata::KEY_DESCRIPTION).cloned().unwrap_or_default(),
        table_count: tables.len(),
        tables,
        total_records,
    })
}

fn count_all_rows(conn: &rusqlite::Connection, tables: &[String]) -> Result<u64> {
    let mut total = 0u64;
    for table in tables {
        total += count_rows(conn, table)?;
    }
    Ok(total)
}

pub(crate) fn count_rows(conn: &rusqlite::Connection, table: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Detailed facts about one database, including its stored schema document
pub fn get_database_info(store: &Store, database: &str) -> Result<DatabaseInfo> {
    let conn = store.open(database)?;
    let meta = metadata::all(&conn)?;
    let tables = store::user_tables(&conn)?;
    let total_records = count_all_rows(&conn, &tables)?;
    let stat = store.file_stat(database)?;

    let schema = meta
        .get(metadata::KEY_SCHEMA)
        .and_then(|text| serde_json::from_str::<DatabaseSchema>(text).ok());

    Ok(DatabaseInfo {
        status: "success".into(),
        database_name: database.to_string(),
        database_description: meta.get(metadata::KEY_DESCRIPTION).cloned().unwrap_or_default(),
        table_count: tables.len(),
        tables,
        total_records,
        size_mb: stat.size_mb,
        created_at: stat.created_at,
        updated_at: stat.updated_at,
        schema,
    })
}

/// Detailed facts about one table: columns joined with stored descriptions,
/// record count, and up to three sample rows.
pub fn get_table_info(store: &Store, database: &str, table: &str) -> Result<TableInfoResult> {
    let conn = store.open(database)?;

    if !store::table_exists(&conn, table)? {
        return Err(GranaryError::not_found(format!(
            "Table '{table}' not found in database '{database}'"
        )));
    }

    // Stored schema supplies the descriptions; tables created with raw SQL
    // simply have empty ones.
    let mut table_description = String::new();
    let mut column_descriptions = std::collections::HashMap::new();
    if let Some(text) = metadata::get(&conn, metadata::KEY_SCHEMA)? {
        if let Ok(schema) = serde_json::from_str::<DatabaseSchema>(&text) {
            if let Some(def) = schema.tables.iter().find(|t| t.table_name == table) {
                table_description = def.table_description.clone();
                for col in &def.columns {
                    column_descriptions.insert(col.name.clone(), col.description.clone());
                }
            }
        }
    }

    let columns: Vec<DescribedColumn> = pragma_columns(&conn, table)?
        .into_iter()
        .map(|c| DescribedColumn {
            description: column_descriptions.get(&c.name).cloned().unwrap_or_default(),
            name: c.name,
            column_type: c.column_type,
            not_null: c.not_null,
            default_value: c.default_value,
            is_primary_key: c.is_primary_key,
        })
        .collect();

    let record_count = count_rows(&conn, table)?;

    let sample = sql::execute_statement(
        &conn,
        &format!("SELECT * FROM {} LIMIT 3", quote_ident(table)),
        &[],
    )?;
    let sample_data = match sample {
        SqlOutcome::Rows { columns, rows, .. } => rows
            .into_iter()
            .map(|row| columns.iter().cloned().zip(row).collect())
            .collect(),
        SqlOutcome::Change { .. } => Vec::new(),
    };

    Ok(TableInfoResult {
        status: "success".into(),
        database_name: database.to_string(),
        table_name: table.to_string(),
        table_description,
        columns,
        record_count,
        sample_data,
    })
}

/// Delete a database with two-step confirmation.
///
/// Without `confirm` the call only reports what would be deleted; with it
/// the file is removed irreversibly.
pub fn delete_database(store: &Store, database: &str, confirm: bool) -> Result<DeleteOutcome> {
    let brief = {
        let conn = store.open(database)?;
        let tables = store::user_tables(&conn)?;
        let total_records = count_all_rows(&conn, &tables)?;
        let stat = store.file_stat(database)?;
        DatabaseBrief {
            database_name: database.to_string(),
            table_count: tables.len(),
            tables,
            total_records,
            size_mb: stat.size_mb,
        }
    };

    if !confirm {
        return Ok(DeleteOutcome::ConfirmationRequired {
            status: "confirmation_required".into(),
            message: format!(
                "Database '{database}' will be deleted permanently. This cannot be undone. \
                 Pass confirm=true to proceed."
            ),
            database_info: brief,
        });
    }

    warn!(database, "deleting database");
    let path = store.delete(database)?;

    Ok(DeleteOutcome::Deleted {
        status: "deleted".into(),
        message: format!("Database '{database}' deleted."),
        deleted_file: path.display().to_string(),
        deleted_info: brief,
    })
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
        let dir = std::env::temp_dir().join(format!("granary_catalog_{thread_id:?}_{id}"));
        let _ = std::fs::remove_dir_all(&dir);
        Store::new(dir)
    }

    fn sample_schema() -> DatabaseSchema {
        serde_json::from_value(json!({
            "database_description": "Unit test fixture database",
            "tables": [{
                "table_name": "items",
                "table_description": "Test items with a name and a price",
                "columns": [
                    {"name": "id", "type": "INTEGER", "description": "Item identifier", "constraints": "PRIMARY KEY"},
                    {"name": "name", "type": "TEXT", "description": "Item display name", "constraints": "NOT NULL"},
                    {"name": "price", "type": "REAL", "description": "Unit price in euros"}
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_create_database_and_info() {
        let store = temp_store();
        let result = create_database(&store, "shop", &sample_schema()).unwrap();
        assert_eq!(result.status, "success");
        assert_eq!(result.tables, vec!["items"]);

        let info = get_database_info(&store, "shop").unwrap();
        assert_eq!(info.database_description, "Unit test fixture database");
        assert_eq!(info.tables, vec!["items"]);
        assert_eq!(info.total_records, 0);
        assert!(info.schema.is_some());

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_create_database_duplicate_rejected() {
        let store = temp_store();
        create_database(&store, "dup", &sample_schema()).unwrap();
        let err = create_database(&store, "dup", &sample_schema()).unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_EXISTS");

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_create_database_bad_table_sql_cleans_up_file() {
        let store = temp_store();
        let mut schema = sample_schema();
        schema.tables[0].columns[0].column_type = "INTEGER)) NONSENSE ((".into();

        assert!(create_database(&store, "broken", &schema).is_err());
        assert!(!store.exists("broken").unwrap());

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_insert_and_query_roundtrip() {
        let store = temp_store();
        create_database(&store, "shop", &sample_schema()).unwrap();

        let result = insert_data(
            &store,
            "shop",
            "items",
            &json!([
                {"id": 1, "name": "apple", "price": 0.5},
                {"id": 2, "name": "pear", "price": 0.7}
            ]),
        )
        .unwrap();
        assert_eq!(result.rows_inserted, 2);

        let query = query_data(&store, "shop", "SELECT name FROM items ORDER BY id").unwrap();
        match query.outcome {
            SqlOutcome::Rows { rows, row_count, .. } => {
                assert_eq!(row_count, 2);
                assert_eq!(rows[0][0], json!("apple"));
            }
            SqlOutcome::Change { .. } => panic!("expected rows"),
        }

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_insert_mismatched_columns_rejected_before_write() {
        let store = temp_store();
        create_database(&store, "shop", &sample_schema()).unwrap();

        let err = insert_data(
            &store,
            "shop",
            "items",
            &json!([
                {"id": 1, "name": "apple", "price": 0.5},
                {"id": 2, "wrong": "pear"}
            ]),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION");

        // Nothing was written
        let query = query_data(&store, "shop", "SELECT COUNT(*) AS n FROM items").unwrap();
        match query.outcome {
            SqlOutcome::Rows { rows, .. } => assert_eq!(rows[0][0], json!(0)),
            SqlOutcome::Change { .. } => panic!("expected rows"),
        }

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_insert_into_missing_table_not_found() {
        let store = temp_store();
        create_database(&store, "shop", &sample_schema()).unwrap();

        let err = insert_data(&store, "shop", "ghost", &json!({"a": 1})).unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_query_modifying_reports_affected_rows() {
        let store = temp_store();
        create_database(&store, "shop", &sample_schema()).unwrap();
        insert_data(&store, "shop", "items", &json!([{"id": 1, "name": "a", "price": 1.0}]))
            .unwrap();

        let result = query_data(&store, "shop", "UPDATE items SET price = 2.0").unwrap();
        assert!(matches!(result.outcome, SqlOutcome::Change { affected_rows: 1 }));

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_table_schema_reports_primary_key() {
        let store = temp_store();
        create_database(&store, "shop", &sample_schema()).unwrap();

        let schema = get_table_schema(&store, "shop", "items").unwrap();
        assert_eq!(schema.columns.len(), 3);
        let id_col = schema.columns.iter().find(|c| c.name == "id").unwrap();
        assert!(id_col.is_primary_key);
        let name_col = schema.columns.iter().find(|c| c.name == "name").unwrap();
        assert!(name_col.not_null);

        let err = get_table_schema(&store, "shop", "ghost").unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_list_databases_counts_records() {
        let store = temp_store();
        create_database(&store, "one", &sample_schema()).unwrap();
        create_database(&store, "two", &sample_schema()).unwrap();
        insert_data(&store, "two", "items", &json!([{"id": 1, "name": "x", "price": 1.0}]))
            .unwrap();

        let listing = list_databases(&store).unwrap();
        assert_eq!(listing.database_count, 2);

        match &listing.databases[1] {
            DatabaseEntry::Summary(s) => {
                assert_eq!(s.database_name, "two.db");
                assert_eq!(s.total_records, 1);
                assert_eq!(s.description, "Unit test fixture database");
            }
            DatabaseEntry::Unreadable { .. } => panic!("expected summary"),
        }

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_table_info_joins_descriptions_and_samples() {
        let store = temp_store();
        create_database(&store, "shop", &sample_schema()).unwrap();
        insert_data(&store, "shop", "items", &json!([{"id": 1, "name": "a", "price": 1.0}]))
            .unwrap();

        let info = get_table_info(&store, "shop", "items").unwrap();
        assert_eq!(info.table_description, "Test items with a name and a price");
        assert_eq!(info.record_count, 1);
        assert_eq!(info.sample_data.len(), 1);
        assert_eq!(info.sample_data[0]["name"], json!("a"));

        let price = info.columns.iter().find(|c| c.name == "price").unwrap();
        assert_eq!(price.description, "Unit price in euros");

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_delete_database_two_step() {
        let store = temp_store();
        create_database(&store, "victim", &sample_schema()).unwrap();

        let outcome = delete_database(&store, "victim", false).unwrap();
        assert!(matches!(outcome, DeleteOutcome::ConfirmationRequired { .. }));
        assert!(store.exists("victim").unwrap());

        let outcome = delete_database(&store, "victim", true).unwrap();
        assert!(matches!(outcome, DeleteOutcome::Deleted { .. }));
        assert!(!store.exists("victim").unwrap());

        let err = delete_database(&store, "victim", true).unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        let _ = std::fs::remove_dir_all(store.root());
    }
}
