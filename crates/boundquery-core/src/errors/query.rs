// ABOUTME: Query-domain error types for parameter validation, pool contention and backend failures
// ABOUTME: Defines QueryError with structured context and its AppError mapping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::error::Error;

use serde_json::json;

use super::{AppError, ErrorCode};

/// Failures surfaced by template parsing and query execution
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The template text itself is malformed
    #[error("Invalid template: {reason}")]
    InvalidTemplate {
        /// What is wrong with the template
        reason: String,
    },

    /// Placeholder set and binding key set differ
    #[error(
        "Placeholder/binding mismatch (missing: [{}], extraneous: [{}])",
        .missing.join(", "),
        .extraneous.join(", ")
    )]
    InvalidParameters {
        /// Placeholders the template requires but the binding omits
        missing: Vec<String>,
        /// Bound names the template does not reference
        extraneous: Vec<String>,
    },

    /// A bound value cannot be used for its placeholder's declared type
    #[error("Invalid value for ':{placeholder}' (expected {expected}): {reason}")]
    InvalidValue {
        /// Placeholder name
        placeholder: String,
        /// Declared placeholder type
        expected: String,
        /// Why the value was rejected
        reason: String,
    },

    /// No template registered under the requested identifier
    #[error("Template '{id}' is not registered")]
    UnknownTemplate {
        /// Requested identifier
        id: String,
    },

    /// No connection became available within the bounded wait
    #[error("Connection pool exhausted after waiting {waited_ms} ms")]
    PoolExhausted {
        /// Configured wait bound
        waited_ms: u64,
    },

    /// The backend driver reported a failure
    #[error("Backend error (transient: {transient}): {message}")]
    Backend {
        /// Whether the failure is safe to retry with backoff
        transient: bool,
        /// Driver message
        message: String,
        /// Underlying driver error
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
}

impl QueryError {
    /// Build an `InvalidValue` error
    pub fn invalid_value(
        placeholder: impl Into<String>,
        expected: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            placeholder: placeholder.into(),
            expected: expected.into(),
            reason: reason.into(),
        }
    }

    /// Build a `Backend` error wrapping a driver error
    pub fn backend(transient: bool, source: impl Error + Send + Sync + 'static) -> Self {
        Self::Backend {
            transient,
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Standard error code for this failure
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidTemplate { .. } | Self::InvalidParameters { .. } => {
                ErrorCode::InvalidInput
            }
            Self::InvalidValue { .. } => ErrorCode::InvalidFormat,
            Self::UnknownTemplate { .. } => ErrorCode::ResourceNotFound,
            Self::PoolExhausted { .. } => ErrorCode::ResourceUnavailable,
            Self::Backend { .. } => ErrorCode::DatabaseError,
        }
    }

    /// Whether the failure is safe to retry with backoff
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::PoolExhausted { .. } => true,
            Self::Backend { transient, .. } => *transient,
            _ => false,
        }
    }
}

impl From<QueryError> for AppError {
    fn from(error: QueryError) -> Self {
        let code = error.code();
        let message = error.to_string();
        let (resource_id, details) = match &error {
            QueryError::InvalidTemplate { reason } => (None, json!({ "reason": reason })),
            QueryError::InvalidParameters {
                missing,
                extraneous,
            } => (
                None,
                json!({ "missing": missing, "extraneous": extraneous }),
            ),
            QueryError::InvalidValue {
                placeholder,
                expected,
                ..
            } => (
                Some(placeholder.clone()),
                json!({ "placeholder": placeholder, "expected": expected }),
            ),
            QueryError::UnknownTemplate { id } => (Some(id.clone()), json!({ "template": id })),
            QueryError::PoolExhausted { waited_ms } => {
                (None, json!({ "waited_ms": waited_ms, "transient": true }))
            }
            QueryError::Backend { transient, .. } => (None, json!({ "transient": transient })),
        };

        let mut app_error = Self::new(code, message).with_details(details);
        if let Some(resource_id) = resource_id {
            app_error = app_error.with_resource_id(resource_id);
        }
        app_error.with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameters_message_lists_names() {
        let error = QueryError::InvalidParameters {
            missing: vec!["end".into()],
            extraneous: vec!["limit".into(), "offset".into()],
        };
        assert_eq!(
            error.to_string(),
            "Placeholder/binding mismatch (missing: [end], extraneous: [limit, offset])"
        );
        assert_eq!(error.code().http_status(), 400);
    }

    #[test]
    fn test_taxonomy_status_mapping() {
        assert_eq!(
            QueryError::invalid_value("start", "date", "not a date")
                .code()
                .http_status(),
            400
        );
        assert_eq!(
            QueryError::PoolExhausted { waited_ms: 50 }.code().http_status(),
            503
        );
        let backend = QueryError::Backend {
            transient: false,
            message: "no such table: Sales".into(),
            source: None,
        };
        assert_eq!(backend.code().http_status(), 500);
        assert!(!backend.is_retryable());
    }

    #[test]
    fn test_conversion_preserves_retryability() {
        let app: AppError = QueryError::Backend {
            transient: true,
            message: "database is locked".into(),
            source: None,
        }
        .into();
        assert!(app.is_retryable());
        assert_eq!(app.code, ErrorCode::DatabaseError);

        let app: AppError = QueryError::invalid_value("end", "date", "not a date").into();
        assert!(!app.is_retryable());
        assert_eq!(app.context.resource_id.as_deref(), Some("end"));
    }
}
