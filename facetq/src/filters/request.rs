//! Filter request parsing
//!
//! Splits `field__operator` keys and tags values. The incoming map is assumed
//! to be parsed already (query string or body handling belongs to the caller).

use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{FIELD_OPERATOR_SEPARATOR, FilterValue, Operator};

/// Maximum size of filter JSON in bytes (64KB)
pub const MAX_FILTER_JSON_SIZE: usize = 64 * 1024;

/// Maximum number of entries in one filter request
pub const MAX_FILTER_ENTRIES: usize = 100;

/// A request key after splitting on the separator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterKey {
    /// `field`: implicit equality, merged at the top level
    Direct(String),
    /// `field__operator`
    Operator { field: String, operator: Operator },
    /// Empty field or an operator suffix that cannot be an operator name
    Malformed,
}

impl FilterKey {
    /// Split a key on its first `__`.
    ///
    /// `a__b__c` yields field `a` with the suffix `b__c`, which never names an
    /// operator, so the key is malformed.
    pub fn parse(key: &str) -> Self {
        match key.split_once(FIELD_OPERATOR_SEPARATOR) {
            None if key.is_empty() => FilterKey::Malformed,
            None => FilterKey::Direct(key.to_string()),
            Some((field, _)) if field.is_empty() => FilterKey::Malformed,
            Some((field, suffix)) => match Operator::parse_suffix(suffix) {
                Some(operator) => FilterKey::Operator {
                    field: field.to_string(),
                    operator,
                },
                None => FilterKey::Malformed,
            },
        }
    }
}

/// One `(key, value)` pair of a filter request
#[derive(Debug, Clone, PartialEq)]
pub struct FilterEntry {
    pub key: String,
    pub parsed: FilterKey,
    /// `None` for absent/null values, which the compiler skips
    pub value: Option<FilterValue>,
}

impl FilterEntry {
    pub fn new(key: impl Into<String>, value: Option<FilterValue>) -> Self {
        let key = key.into();
        let parsed = FilterKey::parse(&key);
        Self { key, parsed, value }
    }
}

/// Ordered, pre-parsed filter request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterRequest {
    entries: Vec<FilterEntry>,
}

impl FilterRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a typed entry (builder style)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.push(key, Some(value.into()));
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: Option<FilterValue>) {
        self.entries.push(FilterEntry::new(key, value));
    }

    /// Build from a JSON object, keeping key order
    pub fn from_json_map(map: &Map<String, Value>) -> Result<Self, FilterError> {
        if map.len() > MAX_FILTER_ENTRIES {
            return Err(FilterError::InvalidRequest(format!(
                "Maximum {} filter entries allowed",
                MAX_FILTER_ENTRIES
            )));
        }
        let entries = map
            .iter()
            .map(|(key, value)| FilterEntry::new(key.as_str(), FilterValue::from_json(value)))
            .collect();
        Ok(Self { entries })
    }

    pub fn from_json(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Object(map) => Self::from_json_map(map),
            other => Err(FilterError::InvalidRequest(format!(
                "expected a JSON object, got {}",
                json_type_name(other)
            ))),
        }
    }

    /// Parse from a JSON string, enforcing the size limit first
    pub fn from_json_str(json_str: &str) -> Result<Self, FilterError> {
        if json_str.len() > MAX_FILTER_JSON_SIZE {
            return Err(FilterError::InvalidRequest(format!(
                "Filter JSON exceeds maximum size of {} bytes",
                MAX_FILTER_JSON_SIZE
            )));
        }
        let value: Value = serde_json::from_str(json_str)
            .map_err(|e| FilterError::InvalidRequest(e.to_string()))?;
        Self::from_json(&value)
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<FilterValue>)> for FilterRequest {
    fn from_iter<I: IntoIterator<Item = (K, Option<FilterValue>)>>(iter: I) -> Self {
        let mut request = Self::new();
        for (key, value) in iter {
            request.push(key, value);
        }
        request
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
