//! MongoDB predicate builders
//!
//! Fragments are aggregation expressions evaluated inside
//! `{"$expr": {"$and": [...]}}`, with BSON types written in extended JSON
//! (`$date`, `$numberDecimal`) so the client can convert them losslessly.

use serde::Serialize;
use serde_json::{Map, Value, json};

use super::coerce::{Comparable, coerce_or_raw};
use super::types::{FilterValue, format_timestamp};

/// Compiled query for the document backend
///
/// `direct_equality` holds separator-less keys, matched at the top level of
/// the filter document. Every operator fragment lands in `conjuncts`,
/// including explicit `__exact`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MongoQuery {
    pub direct_equality: Map<String, Value>,
    pub conjuncts: Vec<Value>,
}

impl MongoQuery {
    /// Render the filter document. An empty query renders as `{}`.
    pub fn to_document(&self) -> Value {
        let mut doc = self.direct_equality.clone();
        if !self.conjuncts.is_empty() {
            doc.insert(
                "$expr".to_string(),
                json!({ "$and": self.conjuncts.clone() }),
            );
        }
        Value::Object(doc)
    }

    pub fn is_empty(&self) -> bool {
        self.direct_equality.is_empty() && self.conjuncts.is_empty()
    }
}

impl Serialize for MongoQuery {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

/// `$field` path reference used inside aggregation expressions
pub fn field_path(field: &str) -> String {
    format!("${}", field)
}

/// Extended-JSON rendering of a filter value
pub fn to_bson_json(value: &FilterValue) -> Value {
    match value {
        FilterValue::Date(d) => json!({ "$date": format_timestamp(d) }),
        FilterValue::List(items) => Value::Array(items.iter().map(to_bson_json).collect()),
        scalar => scalar.to_json(),
    }
}

fn expr(operator: &str, args: Value) -> Value {
    let mut map = Map::new();
    map.insert(operator.to_string(), args);
    Value::Object(map)
}

/// `field == value`, no coercion
pub fn exact(field: &str, value: &FilterValue) -> Option<Value> {
    Some(expr("$eq", json!([field_path(field), to_bson_json(value)])))
}

/// Case-insensitive substring match over the field's string form.
/// The needle is regex-escaped so it matches literally.
pub fn icontains(field: &str, value: &FilterValue) -> Option<Value> {
    let needle = value.as_text()?;
    Some(json!({
        "$regexMatch": {
            "input": { "$toString": field_path(field) },
            "regex": regex::escape(&needle),
            "options": "i"
        }
    }))
}

pub fn gte(field: &str, value: &FilterValue) -> Option<Value> {
    range("$gte", field, value)
}

pub fn lte(field: &str, value: &FilterValue) -> Option<Value> {
    range("$lte", field, value)
}

/// Membership; scalars are normalized to a one-element set
pub fn in_list(field: &str, value: &FilterValue) -> Option<Value> {
    let items: Vec<Value> = value.as_list().iter().map(to_bson_json).collect();
    Some(expr("$in", json!([field_path(field), items])))
}

fn range(operator: &str, field: &str, value: &FilterValue) -> Option<Value> {
    let args = match coerce_or_raw(value)? {
        Comparable::Date(d) => json!([field_path(field), { "$date": format_timestamp(&d) }]),
        Comparable::Number(n) => json!([field_path(field), { "$numberDecimal": n.to_string() }]),
        Comparable::Numeric(text) => json!([field_path(field), { "$numberDecimal": text }]),
        Comparable::Text(raw) => json!([field_path(field), raw]),
    };
    Some(expr(operator, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_fragment() {
        assert_eq!(
            exact("status", &FilterValue::from("ACTIVE")),
            Some(json!({"$eq": ["$status", "ACTIVE"]}))
        );
    }

    #[test]
    fn icontains_escapes_regex() {
        assert_eq!(
            icontains("name", &FilterValue::from("a.b")),
            Some(json!({
                "$regexMatch": {
                    "input": {"$toString": "$name"},
                    "regex": "a\\.b",
                    "options": "i"
                }
            }))
        );
        assert_eq!(icontains("name", &FilterValue::from(vec!["a"])), None);
    }

    #[test]
    fn gte_date_fragment() {
        assert_eq!(
            gte("createdAt", &FilterValue::from("2023-01-01")),
            Some(json!({"$gte": ["$createdAt", {"$date": "2023-01-01T00:00:00.000Z"}]}))
        );
    }

    #[test]
    fn lte_decimal_fragment() {
        assert_eq!(
            lte("price", &FilterValue::from("49.99")),
            Some(json!({"$lte": ["$price", {"$numberDecimal": "49.99"}]}))
        );
    }

    #[test]
    fn out_of_range_numbers_compare_as_decimal128() {
        assert_eq!(
            gte("price", &FilterValue::from("100000000000000000000000000000")),
            Some(json!({
                "$gte": ["$price", {"$numberDecimal": "100000000000000000000000000000"}]
            }))
        );

        let n: serde_json::Number = serde_json::from_str("1e30").unwrap();
        let fragment = gte("price", &FilterValue::Number(n)).unwrap();
        let bound = &fragment["$gte"][1]["$numberDecimal"];
        assert_eq!(bound.as_str().unwrap().parse::<f64>().unwrap(), 1e30);
        assert_eq!(fragment["$gte"][0], json!("$price"));
    }

    #[test]
    fn range_raw_text_and_veto() {
        assert_eq!(
            gte("code", &FilterValue::from("abc")),
            Some(json!({"$gte": ["$code", "abc"]}))
        );
        assert_eq!(gte("code", &FilterValue::from(true)), None);
    }

    #[test]
    fn in_singleton_normalized() {
        assert_eq!(
            in_list("age", &FilterValue::from("5")),
            Some(json!({"$in": ["$age", ["5"]]}))
        );
    }

    #[test]
    fn document_rendering() {
        let empty = MongoQuery::default();
        assert!(empty.is_empty());
        assert_eq!(empty.to_document(), json!({}));

        let mut query = MongoQuery::default();
        query.direct_equality.insert("tenant".into(), json!("acme"));
        query.conjuncts.push(json!({"$eq": ["$status", "ACTIVE"]}));
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "tenant": "acme",
                "$expr": {"$and": [{"$eq": ["$status", "ACTIVE"]}]}
            })
        );
    }
}
