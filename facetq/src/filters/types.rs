//! Filter type definitions
//!
//! Defines backends, operators and the tagged values carried by a filter
//! request.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::error::FilterError;

/// Separator between the field name and the operator suffix in request keys
pub const FIELD_OPERATOR_SEPARATOR: &str = "__";

/// Storage backend a filter request is compiled for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Document store queried through aggregation expressions
    #[default]
    #[serde(alias = "mongo")]
    Mongodb,
    /// Relational database queried through a WHERE clause
    #[serde(alias = "postgres", alias = "sql")]
    Relational,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Mongodb => "mongodb",
            Backend::Relational => "relational",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Name of a caller-defined operator
///
/// Only constructed through [`OperatorName::new`], which enforces lower-case
/// ASCII letters, digits and underscores without the key separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatorName(String);

impl OperatorName {
    pub fn new(name: &str) -> Result<Self, FilterError> {
        if name.is_empty() {
            return Err(FilterError::invalid_operator_name(name, "name is empty"));
        }
        if name.contains(FIELD_OPERATOR_SEPARATOR) {
            return Err(FilterError::invalid_operator_name(
                name,
                "name contains the '__' separator",
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(FilterError::invalid_operator_name(
                name,
                "only lower-case letters, digits and '_' are allowed",
            ));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Comparison operator applicable to a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    /// Equality
    Exact,
    /// Case-insensitive substring match
    IContains,
    /// Greater than or equal (date-or-number coercion)
    Gte,
    /// Less than or equal (date-or-number coercion)
    Lte,
    /// Membership in a value set
    In,
    /// Caller-defined operator
    Custom(OperatorName),
}

impl Operator {
    /// Builtin operators in registration order
    pub const BUILTINS: [Operator; 5] = [
        Operator::Exact,
        Operator::IContains,
        Operator::Gte,
        Operator::Lte,
        Operator::In,
    ];

    /// Resolve a builtin by wire name (case-insensitive)
    pub fn builtin(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "exact" => Some(Operator::Exact),
            "icontains" => Some(Operator::IContains),
            "gte" => Some(Operator::Gte),
            "lte" => Some(Operator::Lte),
            "in" => Some(Operator::In),
            _ => None,
        }
    }

    /// Resolve a registration name: builtin names map to the builtin,
    /// anything else must be a valid custom name.
    pub fn from_name(name: &str) -> Result<Self, FilterError> {
        match Self::builtin(name) {
            Some(op) => Ok(op),
            None => OperatorName::new(name).map(Operator::Custom),
        }
    }

    /// Resolve an operator suffix from a request key.
    ///
    /// Returns `None` for suffixes that can never name a registered operator.
    pub fn parse_suffix(suffix: &str) -> Option<Self> {
        Self::builtin(suffix).or_else(|| {
            OperatorName::new(&suffix.to_ascii_lowercase())
                .ok()
                .map(Operator::Custom)
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Exact => "exact",
            Operator::IContains => "icontains",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::Custom(name) => name.as_str(),
        }
    }

    /// Range bounds go through date-or-number coercion
    pub fn is_range(&self) -> bool {
        matches!(self, Operator::Gte | Operator::Lte)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Operator::from_name(&name.to_ascii_lowercase()).map_err(serde::de::Error::custom)
    }
}

/// Filter value, tagged when the request is read
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Date(DateTime<Utc>),
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Tag a JSON value. `null` (and `null` list items) yield nothing; objects
    /// fall outside the request grammar and are dropped too.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null | Value::Object(_) => None,
            Value::String(s) => Some(FilterValue::String(s.clone())),
            Value::Number(n) => Some(FilterValue::Number(n.clone())),
            Value::Bool(b) => Some(FilterValue::Bool(*b)),
            Value::Array(items) => Some(FilterValue::List(
                items.iter().filter_map(FilterValue::from_json).collect(),
            )),
        }
    }

    /// Plain JSON rendering (dates as RFC 3339 strings)
    pub fn to_json(&self) -> Value {
        match self {
            FilterValue::String(s) => Value::String(s.clone()),
            FilterValue::Number(n) => Value::Number(n.clone()),
            FilterValue::Bool(b) => Value::Bool(*b),
            FilterValue::Date(d) => Value::String(format_timestamp(d)),
            FilterValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// String form of a scalar; lists have none
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            FilterValue::String(s) => Some(Cow::Borrowed(s)),
            FilterValue::Number(n) => Some(Cow::Owned(n.to_string())),
            FilterValue::Bool(b) => Some(Cow::Owned(b.to_string())),
            FilterValue::Date(d) => Some(Cow::Owned(format_timestamp(d))),
            FilterValue::List(_) => None,
        }
    }

    /// Membership set: a list as-is, any scalar as a one-element set
    pub fn as_list(&self) -> Cow<'_, [FilterValue]> {
        match self {
            FilterValue::List(items) => Cow::Borrowed(items.as_slice()),
            scalar => Cow::Owned(vec![scalar.clone()]),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FilterValue::List(_))
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Number(n.into())
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(d: DateTime<Utc>) -> Self {
        FilterValue::Date(d)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(items: Vec<T>) -> Self {
        FilterValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix
pub fn format_timestamp(d: &DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_operator_builtin_names() {
        for op in Operator::BUILTINS {
            assert_eq!(Operator::builtin(op.as_str()), Some(op.clone()));
        }
        assert_eq!(Operator::builtin("GTE"), Some(Operator::Gte));
        assert_eq!(Operator::builtin("between"), None);
    }

    #[test]
    fn test_operator_from_name_custom() {
        let op = Operator::from_name("starts_with").unwrap();
        assert_eq!(op.as_str(), "starts_with");
        assert!(matches!(op, Operator::Custom(_)));
    }

    #[test]
    fn test_operator_from_name_rejects_invalid() {
        assert!(matches!(
            Operator::from_name(""),
            Err(FilterError::InvalidOperatorName { .. })
        ));
        assert!(Operator::from_name("not__this").is_err());
        assert!(Operator::from_name("NotLower").is_err());
        assert!(Operator::from_name("has space").is_err());
    }

    #[test]
    fn test_operator_parse_suffix() {
        assert_eq!(Operator::parse_suffix("ICONTAINS"), Some(Operator::IContains));
        assert_eq!(
            Operator::parse_suffix("Near"),
            Some(Operator::Custom(OperatorName::new("near").unwrap()))
        );
        assert_eq!(Operator::parse_suffix(""), None);
        assert_eq!(Operator::parse_suffix("a-b"), None);
    }

    #[test]
    fn test_operator_serde() {
        let ops: Vec<Operator> = serde_json::from_value(json!(["GTE", "lte", "near"])).unwrap();
        assert_eq!(ops[0], Operator::Gte);
        assert_eq!(ops[1], Operator::Lte);
        assert_eq!(ops[2].as_str(), "near");
        assert_eq!(serde_json::to_value(&ops).unwrap(), json!(["gte", "lte", "near"]));
    }

    #[test]
    fn test_backend_serde_aliases() {
        let b: Backend = serde_json::from_value(json!("postgres")).unwrap();
        assert_eq!(b, Backend::Relational);
        let b: Backend = serde_json::from_value(json!("mongodb")).unwrap();
        assert_eq!(b, Backend::Mongodb);
        assert_eq!(serde_json::to_value(Backend::Relational).unwrap(), json!("relational"));
    }

    #[test]
    fn test_filter_value_from_json() {
        assert_eq!(FilterValue::from_json(&json!(null)), None);
        assert_eq!(FilterValue::from_json(&json!({"a": 1})), None);
        assert_eq!(
            FilterValue::from_json(&json!("x")),
            Some(FilterValue::String("x".into()))
        );
        assert_eq!(
            FilterValue::from_json(&json!([1, null, "a"])),
            Some(FilterValue::List(vec![
                FilterValue::Number(1.into()),
                FilterValue::String("a".into()),
            ]))
        );
    }

    #[test]
    fn test_filter_value_as_list_normalizes_scalar() {
        let v = FilterValue::from("5");
        assert_eq!(v.as_list().as_ref(), &[FilterValue::from("5")]);

        let list = FilterValue::from(vec!["a", "b"]);
        assert_eq!(list.as_list().len(), 2);
    }

    #[test]
    fn test_filter_value_text_and_json() {
        let date = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let v = FilterValue::Date(date);
        assert_eq!(v.as_text().unwrap(), "2023-01-01T00:00:00.000Z");
        assert_eq!(v.to_json(), json!("2023-01-01T00:00:00.000Z"));
        assert!(FilterValue::from(vec![1i64]).as_text().is_none());
        assert_eq!(FilterValue::from(true).as_text().unwrap(), "true");
    }
}
