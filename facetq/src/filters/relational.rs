//! Relational predicate builders
//!
//! A compiled relational query is a dialect-neutral condition map. SQL text
//! is only produced by [`RelationalWhere::to_sql`], which binds every value
//! as a parameter.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;

use super::coerce::{Comparable, coerce_or_raw, decimal_from_number, numeric_text};
use super::types::{FilterValue, Operator};
use crate::sql::{SqlDialect, SqlParams};
use crate::utils::sql::{contains_pattern, quote_identifier};

/// Bound SQL parameter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    /// Number beyond the `Decimal` range, bound as NUMERIC from its text
    Numeric(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Scalar conversion without coercion; lists have no scalar form
    pub fn from_filter_value(value: &FilterValue) -> Option<Self> {
        match value {
            FilterValue::String(s) => Some(SqlValue::Text(s.clone())),
            FilterValue::Number(n) => match n.as_i64() {
                Some(i) => Some(SqlValue::Integer(i)),
                None => decimal_from_number(n)
                    .map(SqlValue::Decimal)
                    .or_else(|| numeric_text(&n.to_string()).map(SqlValue::Numeric))
                    .or_else(|| Some(SqlValue::Text(n.to_string()))),
            },
            FilterValue::Bool(b) => Some(SqlValue::Bool(*b)),
            FilterValue::Date(d) => Some(SqlValue::Timestamp(*d)),
            FilterValue::List(_) => None,
        }
    }
}

impl From<Comparable> for SqlValue {
    fn from(value: Comparable) -> Self {
        match value {
            Comparable::Date(d) => SqlValue::Timestamp(d),
            Comparable::Number(n) => SqlValue::Decimal(n),
            Comparable::Numeric(text) => SqlValue::Numeric(text),
            Comparable::Text(s) => SqlValue::Text(s),
        }
    }
}

/// Operator-wrapped value for one column
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(SqlValue),
    /// Case-insensitive LIKE against an already escaped pattern
    ILike(String),
    Gte(SqlValue),
    Lte(SqlValue),
    In(Vec<SqlValue>),
    /// Caller-supplied SQL. `{column}` is replaced by the quoted column and
    /// each `?` binds the next value of `params`.
    Raw { sql: String, params: Vec<SqlValue> },
}

impl Condition {
    /// Render against an already quoted column
    pub fn to_sql(&self, column: &str, dialect: &dyn SqlDialect, params: &mut SqlParams) -> String {
        match self {
            Condition::Eq(v) => format!("{} = {}", column, params.bind(dialect, v.clone())),
            Condition::ILike(pattern) => {
                let ph = params.bind(dialect, SqlValue::Text(pattern.clone()));
                dialect.ilike(column, &ph)
            }
            Condition::Gte(v) => format!("{} >= {}", column, params.bind(dialect, v.clone())),
            Condition::Lte(v) => format!("{} <= {}", column, params.bind(dialect, v.clone())),
            Condition::In(values) if values.is_empty() => "1=0".to_string(),
            Condition::In(values) => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| params.bind(dialect, v.clone()))
                    .collect();
                format!("{} IN ({})", column, placeholders.join(", "))
            }
            Condition::Raw { sql, params: raw } => {
                // Placeholders are bound only in template text, never inside the column
                let mut values = raw.iter();
                let mut out = String::with_capacity(sql.len() + column.len());
                for (i, segment) in sql.split("{column}").enumerate() {
                    if i > 0 {
                        out.push_str(column);
                    }
                    for ch in segment.chars() {
                        if ch == '?'
                            && let Some(v) = values.next()
                        {
                            out.push_str(&params.bind(dialect, v.clone()));
                            continue;
                        }
                        out.push(ch);
                    }
                }
                out
            }
        }
    }
}

/// Rendered `WHERE` fragment with its bound parameters, in placeholder order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Compiled query for the relational backend
///
/// Conditions are keyed by field, then by operator, so `price__gte` and
/// `price__lte` coexist while a repeated field+operator pair overwrites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationalWhere {
    pub conditions: IndexMap<String, IndexMap<Operator, Condition>>,
}

impl RelationalWhere {
    pub fn insert(&mut self, field: &str, operator: Operator, condition: Condition) {
        self.conditions
            .entry(field.to_string())
            .or_default()
            .insert(operator, condition);
    }

    pub fn get(&self, field: &str, operator: &Operator) -> Option<&Condition> {
        self.conditions.get(field)?.get(operator)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.values().all(IndexMap::is_empty)
    }

    /// Render with fresh parameter numbering
    pub fn render(&self, dialect: &dyn SqlDialect) -> WhereClause {
        let mut params = SqlParams::default();
        let sql = self.to_sql(dialect, &mut params);
        WhereClause {
            sql,
            params: params.values,
        }
    }

    /// Render an AND-joined WHERE fragment. An empty query renders as `1=1`.
    pub fn to_sql(&self, dialect: &dyn SqlDialect, params: &mut SqlParams) -> String {
        let mut clauses = Vec::new();
        for (field, by_operator) in &self.conditions {
            let column = quote_identifier(field);
            for condition in by_operator.values() {
                clauses.push(condition.to_sql(&column, dialect, params));
            }
        }

        if clauses.is_empty() {
            "1=1".to_string()
        } else {
            clauses.join(" AND ")
        }
    }
}

/// `column = value`, no coercion
pub fn exact(_field: &str, value: &FilterValue) -> Option<Condition> {
    SqlValue::from_filter_value(value).map(Condition::Eq)
}

/// Case-insensitive `LIKE '%value%'` with metacharacters escaped
pub fn icontains(_field: &str, value: &FilterValue) -> Option<Condition> {
    let needle = value.as_text()?;
    Some(Condition::ILike(contains_pattern(&needle)))
}

pub fn gte(_field: &str, value: &FilterValue) -> Option<Condition> {
    coerce_or_raw(value).map(|c| Condition::Gte(c.into()))
}

pub fn lte(_field: &str, value: &FilterValue) -> Option<Condition> {
    coerce_or_raw(value).map(|c| Condition::Lte(c.into()))
}

/// Membership; scalars are normalized to a one-element set
pub fn in_list(_field: &str, value: &FilterValue) -> Option<Condition> {
    let values = value
        .as_list()
        .iter()
        .filter_map(SqlValue::from_filter_value)
        .collect();
    Some(Condition::In(values))
}
