//! Facet error types

use thiserror::Error;

/// Failure reported by a stats provider.
///
/// "No rows" is not an error: providers return `Ok(None)` for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error("Stats backend error: {0}")]
    Backend(String),

    #[error("Stats request cancelled")]
    Cancelled,

    /// Provider gave up because the call deadline had already passed
    #[error("Stats request deadline exceeded")]
    DeadlineExceeded,
}

impl StatsError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Failure of a whole facet computation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FacetError {
    #[error("Range stats unavailable for {field}: {source}")]
    StatsUnavailable {
        field: String,
        #[source]
        source: StatsError,
    },

    #[error("Range stats for {field} timed out after {timeout_ms}ms")]
    Timeout { field: String, timeout_ms: u64 },

    #[error("Facet computation cancelled")]
    Cancelled,
}

impl FacetError {
    pub fn stats_unavailable(field: &str, source: StatsError) -> Self {
        Self::StatsUnavailable {
            field: field.to_string(),
            source,
        }
    }

    pub fn timeout(field: &str, timeout_ms: u64) -> Self {
        Self::Timeout {
            field: field.to_string(),
            timeout_ms,
        }
    }

    /// Field the error is about, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::StatsUnavailable { field, .. } | Self::Timeout { field, .. } => Some(field),
            Self::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_stats_unavailable_display() {
        let err = FacetError::stats_unavailable("price", StatsError::backend("connection reset"));
        assert_eq!(
            err.to_string(),
            "Range stats unavailable for price: Stats backend error: connection reset"
        );
        assert!(err.source().is_some());
        assert_eq!(err.field(), Some("price"));
    }

    #[test]
    fn test_timeout_display() {
        let err = FacetError::timeout("createdAt", 250);
        assert_eq!(
            err.to_string(),
            "Range stats for createdAt timed out after 250ms"
        );
    }

    #[test]
    fn test_cancelled_has_no_field() {
        assert_eq!(FacetError::Cancelled.field(), None);
        assert_eq!(StatsError::Cancelled.to_string(), "Stats request cancelled");
    }
}
