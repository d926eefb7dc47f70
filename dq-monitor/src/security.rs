//! Input validation and credential handling.
//!
//! Rule documents come from outside the process, so every name and parameter
//! that reaches the query engine is validated here first. Secrets (the webhook
//! signing key) are held in a [`SecureString`] that is zeroized on drop.

use crate::error::{MonitorError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use zeroize::{Zeroize, ZeroizeOnDrop};

const MAX_IDENTIFIER_LENGTH: usize = 128;
const MAX_PATTERN_LENGTH: usize = 1000;

/// A secure string that automatically clears its contents when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureString(String);

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl SecureString {
    /// Create a new secure string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string value. Use carefully and avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Convert to a regular string. The SecureString will be zeroized.
    pub fn into_string(mut self) -> String {
        let value = std::mem::take(&mut self.0);
        self.0.zeroize();
        value
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Validation for names and parameters taken from rule documents and config.
pub struct InputValidator;

impl InputValidator {
    /// Validates a database or table name.
    ///
    /// Names must start with a letter or underscore and contain only letters,
    /// digits and underscores.
    pub fn validate_relation_name(name: &str, what: &str) -> Result<()> {
        Self::validate_basic(name, what)?;

        static RELATION_REGEX: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$")
                .expect("Hard-coded regex pattern should be valid")
        });

        if !RELATION_REGEX.is_match(name) {
            return Err(MonitorError::SecurityError(format!(
                "Invalid {what} '{name}': must start with a letter or underscore and contain only letters, numbers and underscores"
            )));
        }
        Ok(())
    }

    /// Validates a column name.
    ///
    /// Columns are referenced as plain identifiers (never spliced into SQL), so
    /// spaces and punctuation found in CSV headers are accepted.
    pub fn validate_column_name(name: &str) -> Result<()> {
        Self::validate_basic(name, "column name")
    }

    /// Validates a regex pattern and returns it compiled.
    pub fn validate_regex_pattern(pattern: &str) -> Result<Regex> {
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(MonitorError::SecurityError(format!(
                "Regex pattern too long (max {MAX_PATTERN_LENGTH} characters)"
            )));
        }
        Self::validate_no_null_bytes(pattern, "Regex pattern")?;

        Regex::new(pattern)
            .map_err(|e| MonitorError::SecurityError(format!("Invalid regex pattern: {e}")))
    }

    /// Validates that a numeric parameter is finite.
    pub fn validate_finite(value: f64, name: &str) -> Result<()> {
        if !value.is_finite() {
            return Err(MonitorError::SecurityError(format!(
                "Invalid {name} value: must be finite (not NaN or infinite)"
            )));
        }
        Ok(())
    }

    /// Validates that a string doesn't contain null bytes.
    pub fn validate_no_null_bytes(value: &str, name: &str) -> Result<()> {
        if value.contains('\0') {
            return Err(MonitorError::SecurityError(format!(
                "{name} cannot contain null bytes"
            )));
        }
        Ok(())
    }

    fn validate_basic(name: &str, what: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(MonitorError::SecurityError(format!(
                "{what} cannot be empty or whitespace-only"
            )));
        }
        if name.len() > MAX_IDENTIFIER_LENGTH {
            return Err(MonitorError::SecurityError(format!(
                "{what} too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }
        Self::validate_no_null_bytes(name, what)
    }
}
