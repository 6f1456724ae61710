//! Date-or-number coercion for range operators
//!
//! Strings are tried as a calendar date first and as a decimal second. The
//! order is fixed: a year-like string such as `"2020"` is read as the date
//! 2020-01-01, never as the number 2020. JSON numbers skip the date probe.
//! Numbers too large for `Decimal` are kept as validated numeric text.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;

use super::types::FilterValue;

/// Right-hand side of a range comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparable {
    Date(DateTime<Utc>),
    Number(Decimal),
    /// Valid number outside the `Decimal` range, as canonical numeric text
    Numeric(String),
    /// Raw text passed through by permissive compilation
    Text(String),
}

/// Coerce a value to a date or decimal; `None` when it is neither
pub fn coerce_comparable(value: &FilterValue) -> Option<Comparable> {
    match value {
        FilterValue::Date(d) => Some(Comparable::Date(*d)),
        FilterValue::Number(n) => decimal_from_number(n)
            .map(Comparable::Number)
            .or_else(|| numeric_text(&n.to_string()).map(Comparable::Numeric)),
        FilterValue::String(s) => parse_date(s)
            .map(Comparable::Date)
            .or_else(|| parse_decimal(s).map(Comparable::Number))
            .or_else(|| numeric_text(s).map(Comparable::Numeric)),
        FilterValue::Bool(_) | FilterValue::List(_) => None,
    }
}

/// Permissive coercion: uncoercible strings fall through as raw text.
///
/// Booleans and lists still yield `None`, which vetoes the entry.
pub fn coerce_or_raw(value: &FilterValue) -> Option<Comparable> {
    coerce_comparable(value).or_else(|| match value {
        FilterValue::String(s) => Some(Comparable::Text(s.clone())),
        _ => None,
    })
}

/// Parse a calendar date or timestamp, interpreting naive forms as UTC.
///
/// Accepted: RFC 3339, `YYYY-MM-DDTHH:MM:SS[.f]`, `YYYY-MM-DD HH:MM:SS[.f]`,
/// `YYYY-MM-DD`, `YYYY-MM` and `YYYY`.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    if !s.is_ascii() {
        return None;
    }

    let date = match s.len() {
        10 => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
        7 if is_digits(&s[..4]) && &s[4..5] == "-" && is_digits(&s[5..]) => {
            NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok()
        }
        4 if is_digits(s) => s
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1)),
        _ => None,
    }?;

    date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

/// Parse a decimal without going through binary floating point
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Convert a JSON number to a decimal, keeping integers exact
pub fn decimal_from_number(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    parse_decimal(&n.to_string())
}

static NUMERIC_TEXT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").ok());

/// Validate decimal or scientific notation text, dropping a leading `+`
pub fn numeric_text(s: &str) -> Option<String> {
    let s = s.trim();
    let re = NUMERIC_TEXT.as_ref()?;
    if !re.is_match(s) {
        return None;
    }
    Some(s.strip_prefix('+').unwrap_or(s).to_string())
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
