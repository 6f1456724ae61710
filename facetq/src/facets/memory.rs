//! In-memory stats provider over JSON documents

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use super::error::StatsError;
use super::stats::{RangeStats, StatsContext, StatsProvider};
use crate::filters::decimal_from_number;

/// Sort key for one observed value; numbers order before strings
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum RangeKey {
    Number(Decimal),
    Text(String),
}

impl RangeKey {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => decimal_from_number(n).map(RangeKey::Number),
            Value::String(s) => Some(RangeKey::Text(s.clone())),
            _ => None,
        }
    }
}

/// Stats provider answering from a fixed set of documents.
///
/// Field names may be dotted paths into nested objects. Nulls, booleans,
/// arrays and objects are ignored.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatsProvider {
    documents: Vec<Value>,
}

impl MemoryStatsProvider {
    pub fn new(documents: Vec<Value>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn range(&self, field: &str) -> Option<RangeStats> {
        let mut min: Option<(RangeKey, &Value)> = None;
        let mut max: Option<(RangeKey, &Value)> = None;

        for value in self.documents.iter().filter_map(|doc| lookup(doc, field)) {
            let Some(key) = RangeKey::from_json(value) else {
                continue;
            };

            if min.as_ref().is_none_or(|(k, _)| key < *k) {
                min = Some((key.clone(), value));
            }
            if max.as_ref().is_none_or(|(k, _)| key > *k) {
                max = Some((key, value));
            }
        }

        match (min, max) {
            (Some((_, min)), Some((_, max))) => Some(RangeStats::new(min.clone(), max.clone())),
            _ => None,
        }
    }
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| current.get(segment))
}

#[async_trait]
impl StatsProvider for MemoryStatsProvider {
    async fn get_range(
        &self,
        field: &str,
        ctx: &StatsContext,
    ) -> Result<Option<RangeStats>, StatsError> {
        if ctx.is_cancelled() {
            return Err(StatsError::Cancelled);
        }
        // The scan is synchronous, so the deadline is only checked up front
        let remaining = ctx.remaining();
        if remaining.is_zero() {
            return Err(StatsError::DeadlineExceeded);
        }
        let range = self.range(field);
        tracing::trace!(
            field,
            found = range.is_some(),
            remaining_ms = remaining.as_millis() as u64,
            "Computed in-memory range"
        );
        Ok(range)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
