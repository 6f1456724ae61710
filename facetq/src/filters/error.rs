//! Error types for filter compilation
//!
//! In the default permissive mode the compiler only ever returns
//! [`FilterError::UnsupportedBackend`]. The remaining compile-time variants
//! are raised when the matching [`Strictness`](super::Strictness) flag is on.

use thiserror::Error;

use super::types::Backend;

/// Errors raised while building registries, descriptors or compiled queries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// No builder at all is registered for the requested backend
    #[error("Backend {backend} has no registered operators")]
    UnsupportedBackend { backend: Backend },

    /// Operator suffix with no builder for the backend (strict mode)
    #[error("Unknown operator '{operator}' in filter key '{key}' for {backend}")]
    UnknownOperator {
        key: String,
        operator: String,
        backend: Backend,
    },

    /// Range value that is neither a date nor a number (strict mode)
    #[error("Cannot compare {field}__{operator} against '{value}': not a date or number")]
    ValueCoercion {
        field: String,
        operator: String,
        value: String,
    },

    /// Key that splits into an empty field or operator (strict mode)
    #[error("Malformed filter key: '{0}'")]
    MalformedKey(String),

    /// Field/operator pair not declared by any field descriptor
    #[error("Filtering {field} by '{operator}' is not allowed")]
    Unauthorized { field: String, operator: String },

    /// Custom operator name rejected at registration
    #[error("Invalid operator name '{name}': {reason}")]
    InvalidOperatorName { name: String, reason: &'static str },

    /// Two descriptors share a field name
    #[error("Duplicate field descriptor: {0}")]
    DuplicateField(String),

    /// Filter request input is not a JSON object, or exceeds limits
    #[error("Invalid filter request: {0}")]
    InvalidRequest(String),
}

impl FilterError {
    pub fn unsupported_backend(backend: Backend) -> Self {
        Self::UnsupportedBackend { backend }
    }

    pub fn unknown_operator(key: &str, operator: &str, backend: Backend) -> Self {
        Self::UnknownOperator {
            key: key.to_string(),
            operator: operator.to_string(),
            backend,
        }
    }

    pub fn value_coercion(field: &str, operator: &str, value: impl Into<String>) -> Self {
        Self::ValueCoercion {
            field: field.to_string(),
            operator: operator.to_string(),
            value: value.into(),
        }
    }

    pub fn unauthorized(field: &str, operator: &str) -> Self {
        Self::Unauthorized {
            field: field.to_string(),
            operator: operator.to_string(),
        }
    }

    pub fn invalid_operator_name(name: &str, reason: &'static str) -> Self {
        Self::InvalidOperatorName {
            name: name.to_string(),
            reason,
        }
    }

    /// Whether the error comes from malformed request input rather than setup
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownOperator { .. }
                | Self::ValueCoercion { .. }
                | Self::MalformedKey(_)
                | Self::Unauthorized { .. }
                | Self::InvalidRequest(_)
        )
    }
}
