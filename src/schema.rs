//! Schema Documents and Validation
//!
//! A database is created from a schema document that makes human-readable
//! metadata mandatory: the database, every table, and every column must carry
//! a description of at least [`MIN_DESCRIPTION_LEN`] characters. Validation
//! runs before any file is touched.

use serde::{Deserialize, Serialize};

use crate::error::{GranaryError, Result};
use crate::sql::quote_ident;

/// Minimum length for every description field
pub const MIN_DESCRIPTION_LEN: usize = 5;

/// Top-level schema document for a database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// Purpose of the database as a whole
    pub database_description: String,
    /// Table definitions; at least one required
    pub tables: Vec<TableSchema>,
}

/// One table definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    /// What this table stores
    pub table_description: String,
    /// Column definitions; at least one required
    pub columns: Vec<ColumnSchema>,
}

/// One column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    /// Declared SQLite type (INTEGER, TEXT, REAL, ...)
    #[serde(rename = "type")]
    pub column_type: String,
    /// What this column represents (units included where relevant)
    pub description: String,
    /// Optional constraint clause (PRIMARY KEY, NOT NULL, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,
}

impl DatabaseSchema {
    /// Validate the whole document. Returns the first problem found.
    pub fn validate(&self) -> Result<()> {
        check_description("database_description", &self.database_description)?;

        if self.tables.is_empty() {
            return Err(GranaryError::validation(
                "Schema must define at least one table",
            ));
        }

        for table in &self.tables {
            table.validate()?;
        }

        Ok(())
    }

    /// Table names in declaration order
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.table_name.clone()).collect()
    }
}

impl TableSchema {
    /// Validate one table definition
    pub fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(GranaryError::validation("table_name must be a non-empty string"));
        }

        if self.table_description.trim().chars().count() < MIN_DESCRIPTION_LEN {
            return Err(GranaryError::validation(format!(
                "table_description for '{}' must be at least {MIN_DESCRIPTION_LEN} characters: \
                 describe what this table stores",
                self.table_name
            )));
        }

        if self.columns.is_empty() {
            return Err(GranaryError::validation(format!(
                "Table '{}' must define at least one column",
                self.table_name
            )));
        }

        for col in &self.columns {
            if col.name.trim().is_empty() {
                return Err(GranaryError::validation(format!(
                    "A column in table '{}' is missing its name",
                    self.table_name
                )));
            }
            if col.column_type.trim().is_empty() {
                return Err(GranaryError::validation(format!(
                    "Column '{}' in table '{}' is missing its type",
                    col.name, self.table_name
                )));
            }
            if col.description.trim().chars().count() < MIN_DESCRIPTION_LEN {
                return Err(GranaryError::validation(format!(
                    "Description for column '{}' in table '{}' must be at least \
                     {MIN_DESCRIPTION_LEN} characters: describe what this column represents",
                    col.name, self.table_name
                )));
            }
        }

        Ok(())
    }

    /// Build the CREATE TABLE statement for this definition
    #[must_use]
    pub fn create_sql(&self) -> String {
        let column_defs: Vec<String> = self
            .columns
            .iter()
            .map(|col| {
                let mut def = format!("{} {}", quote_ident(&col.name), col.column_type);
                if let Some(constraints) = &col.constraints {
                    if !constraints.trim().is_empty() {
                        def.push(' ');
                        def.push_str(constraints);
                    }
                }
                def
            })
            .collect();

        format!("CREATE TABLE {} ({})", quote_ident(&self.table_name), column_defs.join(", "))
    }
}

fn check_description(field: &str, value: &str) -> Result<()> {
    if value.trim().chars().count() < MIN_DESCRIPTION_LEN {
        return Err(GranaryError::validation(format!(
            "'{field}' must be at least {MIN_DESCRIPTION_LEN} characters: state concretely what \
             this database is for"
        )));
    }
    Ok(())
}
