//! SQL utility functions

/// Escape SQL LIKE metacharacters (%, _, \) in user input
///
/// Patterns built from the result must be paired with `ESCAPE '\'`.
///
/// # Example
///
/// ```
/// use facetq::utils::sql::escape_like_pattern;
///
/// let pattern = format!("%{}%", escape_like_pattern("100% match_test"));
/// assert_eq!(pattern, "%100\\% match\\_test%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Wrap user input in `%...%` for a substring LIKE match
pub fn contains_pattern(s: &str) -> String {
    format!("%{}%", escape_like_pattern(s))
}

/// Quote an identifier with double quotes, doubling embedded quotes
///
/// Field names come straight from request keys, so they are never spliced
/// into SQL unquoted.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_pattern_no_special_chars() {
        assert_eq!(escape_like_pattern("hello"), "hello");
    }

    #[test]
    fn test_escape_like_pattern_percent() {
        assert_eq!(escape_like_pattern("100%"), "100\\%");
    }

    #[test]
    fn test_escape_like_pattern_underscore() {
        assert_eq!(escape_like_pattern("foo_bar"), "foo\\_bar");
    }

    #[test]
    fn test_escape_like_pattern_multiple() {
        assert_eq!(escape_like_pattern("100%_\\test"), "100\\%\\_\\\\test");
    }

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("ali"), "%ali%");
        assert_eq!(contains_pattern(""), "%%");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("status"), "\"status\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
