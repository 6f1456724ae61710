//! SQL abstraction layer for rendering relational filters
//!
//! A compiled relational query is dialect-neutral. This module turns it into
//! a parameterised `WHERE` fragment for a concrete database (PostgreSQL,
//! SQLite).

mod dialect;
mod postgres_dialect;
mod sqlite_dialect;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use dialect::{SqlDialect, SqlParams};
pub use postgres_dialect::PostgresDialect;
pub use sqlite_dialect::SqliteDialect;

/// SQL dialect identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    #[serde(alias = "postgresql")]
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Get the SQL dialect implementation
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &PostgresDialect,
            Dialect::Sqlite => &SqliteDialect,
        }
    }

    /// Get the dialect name
    pub fn name(&self) -> &'static str {
        self.dialect().name()
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_names() {
        assert_eq!(Dialect::Postgres.name(), "postgres");
        assert_eq!(Dialect::Sqlite.name(), "sqlite");
        assert_eq!(Dialect::default(), Dialect::Postgres);
    }

    #[test]
    fn test_dialect_deserialize_alias() {
        let d: Dialect = serde_json::from_str("\"postgresql\"").unwrap();
        assert_eq!(d, Dialect::Postgres);
        let d: Dialect = serde_json::from_str("\"sqlite\"").unwrap();
        assert_eq!(d, Dialect::Sqlite);
    }
}
