//! SQL dialect trait for multi-database support

use crate::filters::SqlValue;

/// SQL dialect trait for generating database-specific SQL
///
/// Dialects differ in:
/// - Parameter placeholders (? vs $1)
/// - Case-insensitive pattern matching
/// - Range aggregation over a column
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Generate a parameter placeholder for the given index (1-based)
    ///
    /// - SQLite: Always returns "?"
    /// - PostgreSQL: Returns "$1", "$2", etc.
    fn placeholder(&self, index: usize) -> String;

    /// Generate a case-insensitive LIKE against an escaped pattern
    ///
    /// - PostgreSQL: `col ILIKE $1 ESCAPE '\'`
    /// - SQLite: `LOWER(col) LIKE LOWER(?) ESCAPE '\'`
    fn ilike(&self, col: &str, placeholder: &str) -> String;

    /// Generate the min/max aggregation for a column, ignoring NULLs
    fn min_max(&self, table: &str, col: &str) -> String {
        format!(
            "SELECT MIN({col}) AS min, MAX({col}) AS max FROM {table} WHERE {col} IS NOT NULL",
            col = col,
            table = table
        )
    }
}

/// Collects SQL parameters during rendering (maintains insertion order)
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SqlParams {
    pub values: Vec<SqlValue>,
}

impl SqlParams {
    /// Push a value and return the dialect placeholder that binds it
    pub fn bind(&mut self, dialect: &dyn SqlDialect, value: SqlValue) -> String {
        self.values.push(value);
        dialect.placeholder(self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
