//! Stats provider contract
//!
//! The facet engine never talks to a database. It asks a [`StatsProvider`]
//! for the min/max of a field; the helpers below describe the aggregation a
//! provider should run for each backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::StatsError;
use crate::filters::mongo::field_path;
use crate::sql::SqlDialect;
use crate::utils::sql::quote_identifier;

/// Observed bounds of a field, nulls excluded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeStats {
    pub min: Value,
    pub max: Value,
}

impl RangeStats {
    pub fn new(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }
}

/// Per-call deadline and cancellation handle passed to providers
#[derive(Debug, Clone)]
pub struct StatsContext {
    pub deadline: Instant,
    pub cancel: CancellationToken,
}

impl StatsContext {
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancel,
        }
    }

    /// Time left before the deadline (zero once passed)
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Source of range statistics for the facet engine.
///
/// Implementations must ignore null values and return `Ok(None)` when the
/// field has no non-null rows. Errors are reserved for real failures.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Min/max of `field`, or `None` when there is no data
    async fn get_range(
        &self,
        field: &str,
        ctx: &StatsContext,
    ) -> Result<Option<RangeStats>, StatsError>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str {
        "custom"
    }
}

/// Aggregation pipeline computing the bounds of `field`.
///
/// `$min`/`$max` skip nulls and missing fields; an empty result means no data.
pub fn mongo_range_pipeline(field: &str) -> Value {
    json!([
        { "$match": { field: { "$ne": null } } },
        {
            "$group": {
                "_id": null,
                "min": { "$min": field_path(field) },
                "max": { "$max": field_path(field) }
            }
        }
    ])
}

/// `SELECT MIN/MAX` for `field` in `table`; `table` may be schema-qualified
pub fn relational_range_sql(table: &str, field: &str, dialect: &dyn SqlDialect) -> String {
    let table = table
        .split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".");
    dialect.min_max(&table, &quote_identifier(field))
}
