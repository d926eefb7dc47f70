//! Rendering of reports for output.
//!
//! ```rust
//! use dq_monitor::formatters::{HumanFormatter, ReportFormatter};
//! use dq_monitor::report::generate_report;
//!
//! let outcome = generate_report(&[], "sales", "orders");
//! let text = HumanFormatter::new().with_colors(false).format(&outcome).unwrap();
//! assert!(text.contains("PASSED"));
//! ```

use crate::error::{MonitorError, Result};
use crate::report::{Report, ReportOutcome};
use crate::result::CheckResult;
use std::fmt::Write;

/// Renders a report outcome as text.
pub trait ReportFormatter {
    fn format(&self, outcome: &ReportOutcome) -> Result<String>;
}

/// JSON output, pretty-printed by default.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, outcome: &ReportOutcome) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(outcome)?
        } else {
            serde_json::to_string(outcome)?
        };
        Ok(json)
    }
}

/// Console summary for people.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    use_colors: bool,
    max_failures: Option<usize>,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: true,
            max_failures: None,
        }
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Limits how many failed checks are listed.
    pub fn with_max_failures(mut self, max: usize) -> Self {
        self.max_failures = Some(max);
        self
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn render(&self, report: &Report, out: &mut String) -> std::fmt::Result {
        let summary = &report.summary;

        writeln!(out)?;
        if report.all_passed() {
            writeln!(out, "✅ {}", self.paint("Data quality PASSED", "32"))?;
        } else {
            writeln!(out, "❌ {}", self.paint("Data quality FAILED", "31"))?;
        }
        writeln!(out)?;
        writeln!(out, "Table: {}.{}", report.database, report.table)?;
        writeln!(out, "Timestamp: {}", report.timestamp)?;

        writeln!(out)?;
        writeln!(out, "📊 Summary:")?;
        writeln!(out, "   Total Checks: {}", summary.total_checks)?;
        writeln!(
            out,
            "   ✅ Passed: {}",
            self.paint(&summary.passed_checks.to_string(), "32")
        )?;
        writeln!(
            out,
            "   ❌ Failed: {}",
            self.paint(&summary.failed_checks.to_string(), "31")
        )?;
        if summary.error_checks > 0 {
            writeln!(
                out,
                "   ⚠️  Not evaluated: {}",
                self.paint(&summary.error_checks.to_string(), "33")
            )?;
        }
        writeln!(out, "   Pass Rate: {:.1}%", summary.pass_percentage)?;

        if !report.by_check_type.is_empty() {
            writeln!(out)?;
            writeln!(out, "By check type:")?;
            for (check_type, counts) in &report.by_check_type {
                writeln!(
                    out,
                    "   {check_type:<22} {} passed / {} failed",
                    counts.passed, counts.failed
                )?;
            }
        }

        if !report.failed_checks.is_empty() {
            let shown = self
                .max_failures
                .unwrap_or(report.failed_checks.len())
                .min(report.failed_checks.len());

            writeln!(out)?;
            writeln!(out, "🔍 Failed checks:")?;
            for (i, result) in report.failed_checks[..shown].iter().enumerate() {
                self.render_failure(i + 1, result, out)?;
            }
            if report.failed_checks.len() > shown {
                writeln!(out)?;
                writeln!(
                    out,
                    "   ... and {} more failed checks",
                    report.failed_checks.len() - shown
                )?;
            }
        }

        writeln!(out)
    }

    fn render_failure(&self, position: usize, result: &CheckResult, out: &mut String) -> std::fmt::Result {
        writeln!(out)?;
        let title = result
            .rule_name
            .as_deref()
            .or(result.rule_id.as_deref())
            .unwrap_or("unnamed rule");
        writeln!(out, "   #{position}: {title}")?;
        writeln!(out, "      Check: {} on '{}'", result.check_type, result.column)?;
        if let Some(severity) = result.severity {
            writeln!(out, "      Severity: {severity}")?;
        }
        if let Some(error) = &result.error {
            writeln!(out, "      Error: {}", self.paint(error, "33"))?;
        }
        if let Some(percentage) = result.measurements.as_ref().and_then(|m| m.percentage()) {
            writeln!(out, "      Measured: {percentage:.2}%")?;
        }
        Ok(())
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, outcome: &ReportOutcome) -> Result<String> {
        let mut output = String::new();
        let rendered = match outcome {
            ReportOutcome::Report(report) => self.render(report, &mut output),
            ReportOutcome::Error { error, timestamp } => writeln!(
                output,
                "\n❌ {}\n\nTimestamp: {timestamp}\nError: {error}\n",
                self.paint("Report could not be built", "31")
            ),
        };
        rendered.map_err(|e| MonitorError::Internal(format!("failed to render report: {e}")))?;
        Ok(output)
    }
}
