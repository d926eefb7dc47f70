//! Error types for the data quality monitor.
//!
//! All fallible operations in the crate return [`MonitorError`] through the
//! [`Result`] alias. Sink delivery has its own error type in
//! [`crate::sinks::SinkError`] so that delivery failures can never be confused
//! with evaluation failures.

use std::time::Duration;
use thiserror::Error;

/// The main error type for the data quality monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The rule document could not be read or parsed.
    #[error("Rule source error: {message}")]
    RuleSource {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A dataset (or a reference dataset) could not be resolved.
    #[error("Dataset '{database}.{table}' is unavailable: {message}")]
    DataUnavailable {
        database: String,
        table: String,
        message: String,
    },

    /// A rule is structurally valid but its parameters cannot be used.
    #[error("Invalid rule '{rule_id}': {message}")]
    InvalidRule { rule_id: String, message: String },

    /// A check failed while querying the dataset.
    #[error("Check '{check}' failed: {message}")]
    CheckExecution { check: String, message: String },

    /// A check did not complete within its deadline.
    #[error("Check '{check}' timed out after {timeout:?}")]
    Timeout { check: String, timeout: Duration },

    /// A required column is not present in the dataset.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    SecurityError(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, MonitorError>`.
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Creates a rule source error.
    pub fn rule_source(message: impl Into<String>) -> Self {
        Self::RuleSource {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a rule source error with an underlying cause.
    pub fn rule_source_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::RuleSource {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a data-unavailable error for `database.table`.
    pub fn data_unavailable(
        database: impl Into<String>,
        table: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DataUnavailable {
            database: database.into(),
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid rule error.
    pub fn invalid_rule(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }

    /// Creates a check execution error.
    pub fn check_execution(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CheckExecution {
            check: check.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<MonitorError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            MonitorError::Internal(inner) => MonitorError::Internal(format!("{msg}: {inner}")),
            other => MonitorError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                MonitorError::Internal(inner) => MonitorError::Internal(format!("{msg}: {inner}")),
                other => MonitorError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_data_unavailable_display() {
        let err = MonitorError::data_unavailable("sales", "customers", "table not found");
        assert_eq!(
            err.to_string(),
            "Dataset 'sales.customers' is unavailable: table not found"
        );
    }

    #[test]
    fn test_rule_source_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = MonitorError::rule_source_with_source("could not open rules", Box::new(source));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "Rule source error: could not open rules");
    }

    #[test]
    fn test_timeout_display() {
        let err = MonitorError::Timeout {
            check: "uniqueness".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "Check 'uniqueness' timed out after 30s");

        let err = MonitorError::Timeout {
            check: "pattern".to_string(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "Check 'pattern' timed out after 250ms");
    }

    #[test]
    fn test_invalid_rule_display() {
        let err = MonitorError::invalid_rule("R-7", "pattern is required");
        assert_eq!(err.to_string(), "Invalid rule 'R-7': pattern is required");
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(MonitorError::Internal("Something went wrong".to_string()))
        }

        let err = failing_operation()
            .context("While saving results")
            .unwrap_err();
        assert!(err.to_string().contains("While saving results"));
        assert!(err.to_string().contains("Something went wrong"));
    }
}
