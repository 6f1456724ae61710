//! SQLite SQL dialect implementation

use super::SqlDialect;

/// SQLite SQL dialect
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    // SQLite's LIKE only folds ASCII, so both sides are lowered explicitly
    fn ilike(&self, col: &str, placeholder: &str) -> String {
        format!("LOWER({}) LIKE LOWER({}) ESCAPE '\\'", col, placeholder)
    }
}
