//! The uniform outcome record emitted by every check.
//!
//! A [`CheckResult`] is produced once by a check (or by the dispatcher when a
//! check could not run) and is read by the sink adapters, the result store and
//! the report aggregator. Check-specific quantities live in [`Measurements`],
//! which is flattened into the serialized record so that a completeness result
//! reads as `{"check_type": "completeness", "null_count": 3, ...}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five kinds of check the monitor knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    Completeness,
    Uniqueness,
    ValueRange,
    Pattern,
    ReferentialIntegrity,
}

impl CheckType {
    /// All check types, in declaration order.
    pub const ALL: [CheckType; 5] = [
        CheckType::Completeness,
        CheckType::Uniqueness,
        CheckType::ValueRange,
        CheckType::Pattern,
        CheckType::ReferentialIntegrity,
    ];

    /// The wire name of this check type.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::Completeness => "completeness",
            CheckType::Uniqueness => "uniqueness",
            CheckType::ValueRange => "value_range",
            CheckType::Pattern => "pattern",
            CheckType::ReferentialIntegrity => "referential_integrity",
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CheckType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown check type '{s}'"))
    }
}

/// Severity attached to a rule and carried on its results and alerts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Quantities measured by a check, one variant per check type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Measurements {
    Completeness {
        threshold: f64,
        null_count: u64,
        total_count: u64,
        null_percentage: f64,
    },
    Uniqueness {
        threshold: f64,
        unique_count: u64,
        total_count: u64,
        unique_percentage: f64,
    },
    Pattern {
        pattern: String,
        match_count: u64,
        total_count: u64,
        match_percentage: f64,
    },
    /// `invalid_count`, `total_count` and `valid_percentage` are `None` when
    /// the reference table could not be resolved.
    ReferentialIntegrity {
        ref_database: String,
        ref_table: String,
        ref_column: String,
        invalid_count: Option<u64>,
        total_count: Option<u64>,
        valid_percentage: Option<f64>,
    },
    ValueRange {
        min_value: Option<f64>,
        max_value: Option<f64>,
        actual_min: Option<f64>,
        actual_max: Option<f64>,
    },
}

impl Measurements {
    /// The check type these measurements belong to.
    pub fn check_type(&self) -> CheckType {
        match self {
            Measurements::Completeness { .. } => CheckType::Completeness,
            Measurements::Uniqueness { .. } => CheckType::Uniqueness,
            Measurements::ValueRange { .. } => CheckType::ValueRange,
            Measurements::Pattern { .. } => CheckType::Pattern,
            Measurements::ReferentialIntegrity { .. } => CheckType::ReferentialIntegrity,
        }
    }

    /// The headline percentage of the check, if it has one and it was measured.
    ///
    /// Value range checks have no percentage.
    pub fn percentage(&self) -> Option<f64> {
        match self {
            Measurements::Completeness {
                null_percentage, ..
            } => Some(*null_percentage),
            Measurements::Uniqueness {
                unique_percentage, ..
            } => Some(*unique_percentage),
            Measurements::Pattern {
                match_percentage, ..
            } => Some(*match_percentage),
            Measurements::ReferentialIntegrity {
                valid_percentage, ..
            } => *valid_percentage,
            Measurements::ValueRange { .. } => None,
        }
    }
}

/// The structured outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub check_type: CheckType,
    pub column: String,
    #[serde(flatten)]
    pub measurements: Option<Measurements>,
    pub passed: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl CheckResult {
    /// Creates a result from measured quantities.
    pub fn measured(column: impl Into<String>, measurements: Measurements, passed: bool) -> Self {
        Self {
            check_type: measurements.check_type(),
            column: column.into(),
            measurements: Some(measurements),
            passed,
            timestamp: Utc::now(),
            error: None,
            rule_id: None,
            rule_name: None,
            rule_description: None,
            severity: None,
        }
    }

    /// Creates a failed result for a check that could not be evaluated.
    ///
    /// No quantities are recorded; `error` carries the failure description.
    pub fn errored(
        check_type: CheckType,
        column: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            check_type,
            column: column.into(),
            measurements: None,
            passed: false,
            timestamp: Utc::now(),
            error: Some(error.into()),
            rule_id: None,
            rule_name: None,
            rule_description: None,
            severity: None,
        }
    }

    /// Attaches an error description while keeping the measured quantities.
    ///
    /// Used when a check measured what it could before hitting a data
    /// availability problem. The result is forced to failed.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.passed = false;
        self
    }

    /// Returns true if the result records an evaluation error rather than a
    /// measured quality failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Checks that the record is internally consistent.
    ///
    /// An error result must be failed, and measurements must belong to the
    /// result's check type.
    pub fn validate_shape(&self) -> Result<(), String> {
        if self.error.is_some() && self.passed {
            return Err(format!(
                "result for column '{}' carries an error but is marked passed",
                self.column
            ));
        }
        if let Some(measurements) = &self.measurements {
            let measured = measurements.check_type();
            if measured != self.check_type {
                return Err(format!(
                    "result for column '{}' is a {} check but carries {} measurements",
                    self.column, self.check_type, measured
                ));
            }
        }
        Ok(())
    }
}
