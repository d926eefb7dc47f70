//! Aggregation of a result batch into a report.
//!
//! [`Report::from_results`] is a pure reduction: it borrows the results,
//! never reorders them and keeps the failed ones in input order.
//! [`generate_report`] validates each result first and turns a malformed
//! batch into [`ReportOutcome::Error`] instead of an error return.

use crate::result::{CheckResult, CheckType};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, instrument};

/// Overall counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_checks: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
    /// Failed results that carry an error, i.e. checks that could not be
    /// evaluated rather than checks that measured bad data.
    pub error_checks: usize,
    /// 100.0 for an empty batch.
    pub pass_percentage: f64,
}

/// Counts for one check type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckTypeSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

/// Summary of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub database: String,
    pub table: String,
    pub timestamp: DateTime<Utc>,
    pub summary: ReportSummary,
    pub by_check_type: BTreeMap<CheckType, CheckTypeSummary>,
    pub failed_checks: Vec<CheckResult>,
}

impl Report {
    /// Builds a report over `results`.
    pub fn from_results(results: &[CheckResult], database: &str, table: &str) -> Self {
        let mut by_check_type: BTreeMap<CheckType, CheckTypeSummary> = BTreeMap::new();
        let mut failed_checks = Vec::new();
        let mut error_checks = 0;

        for result in results {
            let entry = by_check_type.entry(result.check_type).or_default();
            entry.total += 1;
            if result.passed {
                entry.passed += 1;
            } else {
                entry.failed += 1;
                if result.is_error() {
                    error_checks += 1;
                }
                failed_checks.push(result.clone());
            }
        }

        let total_checks = results.len();
        let failed = failed_checks.len();
        let passed_checks = total_checks - failed;
        let pass_percentage = if total_checks == 0 {
            100.0
        } else {
            passed_checks as f64 / total_checks as f64 * 100.0
        };

        Self {
            database: database.to_string(),
            table: table.to_string(),
            timestamp: Utc::now(),
            summary: ReportSummary {
                total_checks,
                passed_checks,
                failed_checks: failed,
                error_checks,
                pass_percentage,
            },
            by_check_type,
            failed_checks,
        }
    }

    /// True when every check passed.
    pub fn all_passed(&self) -> bool {
        self.summary.failed_checks == 0
    }
}

/// The outcome of report generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportOutcome {
    Report(Box<Report>),
    /// The result batch could not be summarized.
    Error {
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl ReportOutcome {
    pub fn report(&self) -> Option<&Report> {
        match self {
            ReportOutcome::Report(report) => Some(report),
            ReportOutcome::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ReportOutcome::Error { .. })
    }
}

/// Validates `results` and builds a report.
#[instrument(skip(results), fields(results = results.len()))]
pub fn generate_report(results: &[CheckResult], database: &str, table: &str) -> ReportOutcome {
    for (index, result) in results.iter().enumerate() {
        if let Err(problem) = result.validate_shape() {
            error!(index, problem = %problem, "Malformed result, cannot build report");
            return ReportOutcome::Error {
                error: format!("malformed result at position {index}: {problem}"),
                timestamp: Utc::now(),
            };
        }
    }
    ReportOutcome::Report(Box::new(Report::from_results(results, database, table)))
}
