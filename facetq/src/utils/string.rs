//! String utility functions

/// Turn an enum key such as `IN_PROGRESS` into a display label (`In Progress`).
///
/// Splits on `_`, upper-cases the first character of each token, lower-cases
/// the rest and joins the tokens with single spaces. Empty tokens are kept,
/// so `A__B` becomes `A  B`.
pub fn format_enum_label(key: &str) -> String {
    key.split('_')
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_enum_label_single_word() {
        assert_eq!(format_enum_label("ACTIVE"), "Active");
        assert_eq!(format_enum_label("inactive"), "Inactive");
    }

    #[test]
    fn test_format_enum_label_multiple_words() {
        assert_eq!(format_enum_label("IN_PROGRESS"), "In Progress");
        assert_eq!(format_enum_label("on_hold_LONG"), "On Hold Long");
    }

    #[test]
    fn test_format_enum_label_empty_tokens() {
        assert_eq!(format_enum_label(""), "");
        assert_eq!(format_enum_label("A__B"), "A  B");
    }

    #[test]
    fn test_format_enum_label_non_ascii() {
        assert_eq!(format_enum_label("ÉTAT_ÜBER"), "État Über");
    }
}
