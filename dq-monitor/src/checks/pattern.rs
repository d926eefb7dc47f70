//! Pattern: every non-null value must match a regular expression.

use super::{percentage, EvaluationContext, QualityCheck};
use crate::error::Result;
use crate::result::{CheckResult, CheckType, Measurements};
use crate::security::InputValidator;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Passes only when every non-null value of `column` contains a match for
/// `pattern`. There is no tolerance: one mismatch fails the check no matter
/// how high the match percentage is.
///
/// Values are rendered as text before matching, and a match may occur
/// anywhere in the value, so anchor the pattern with `^...$` to match whole
/// values.
#[derive(Debug, Clone)]
pub struct PatternCheck {
    column: String,
    pattern: String,
}

impl PatternCheck {
    pub fn new(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    fn result(&self, match_count: u64, total_count: u64, passed: bool) -> CheckResult {
        let match_percentage = if total_count == 0 {
            0.0
        } else {
            percentage(match_count, total_count)
        };
        CheckResult::measured(
            &self.column,
            Measurements::Pattern {
                pattern: self.pattern.clone(),
                match_count,
                total_count,
                match_percentage,
            },
            passed,
        )
    }
}

#[async_trait]
impl QualityCheck for PatternCheck {
    fn check_type(&self) -> CheckType {
        CheckType::Pattern
    }

    fn column(&self) -> &str {
        &self.column
    }

    #[instrument(skip(self, ctx), fields(
        check.column = %self.column,
        check.pattern = %self.pattern
    ))]
    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<CheckResult> {
        InputValidator::validate_regex_pattern(&self.pattern)?;

        let non_null = ctx.dataset().filter_not_null(&self.column)?;
        let total_count = non_null.row_count().await?;
        if total_count == 0 {
            debug!(check.column = %self.column, "No non-null values, passing");
            return Ok(self.result(0, 0, true));
        }

        let match_count = non_null
            .regex_match_count(&self.column, &self.pattern)
            .await?;
        let passed = match_count == total_count;

        debug!(
            check.column = %self.column,
            data.rows = total_count,
            data.matches = match_count,
            result.passed = passed,
            "Pattern evaluated"
        );

        Ok(self.result(match_count, total_count, passed))
    }
}
