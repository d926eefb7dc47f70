//! Value range: observed extremes of a numeric column against fixed bounds.

use super::{EvaluationContext, QualityCheck};
use crate::error::{MonitorError, Result};
use crate::result::{CheckResult, CheckType, Measurements};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Passes when the smallest non-null value is at least `min_value` and the
/// largest is at most `max_value`. A missing bound is not checked.
///
/// Values are compared as `f64`. A column with non-null values but no
/// numeric extremes cannot be judged and is reported as an evaluation error.
#[derive(Debug, Clone)]
pub struct ValueRangeCheck {
    column: String,
    min_value: Option<f64>,
    max_value: Option<f64>,
}

impl ValueRangeCheck {
    pub fn new(column: impl Into<String>, min_value: Option<f64>, max_value: Option<f64>) -> Self {
        Self {
            column: column.into(),
            min_value,
            max_value,
        }
    }

    fn within_bounds(&self, actual_min: f64, actual_max: f64) -> bool {
        let min_ok = self.min_value.is_none_or(|min| actual_min >= min);
        let max_ok = self.max_value.is_none_or(|max| actual_max <= max);
        min_ok && max_ok
    }

    fn result(&self, actual_min: Option<f64>, actual_max: Option<f64>, passed: bool) -> CheckResult {
        CheckResult::measured(
            &self.column,
            Measurements::ValueRange {
                min_value: self.min_value,
                max_value: self.max_value,
                actual_min,
                actual_max,
            },
            passed,
        )
    }
}

#[async_trait]
impl QualityCheck for ValueRangeCheck {
    fn check_type(&self) -> CheckType {
        CheckType::ValueRange
    }

    fn column(&self) -> &str {
        &self.column
    }

    #[instrument(skip(self, ctx), fields(
        check.column = %self.column,
        check.min_value = ?self.min_value,
        check.max_value = ?self.max_value
    ))]
    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<CheckResult> {
        let non_null = ctx.dataset().filter_not_null(&self.column)?;
        if non_null.row_count().await? == 0 {
            debug!(check.column = %self.column, "No non-null values, passing");
            return Ok(self.result(None, None, true));
        }

        let (actual_min, actual_max) = non_null.min_max(&self.column).await?;
        let passed = match (actual_min, actual_max) {
            (Some(min), Some(max)) => self.within_bounds(min, max),
            _ => {
                return Err(MonitorError::check_execution(
                    CheckType::ValueRange.to_string(),
                    format!("column '{}' has no numeric values", self.column),
                ))
            }
        };

        debug!(
            check.column = %self.column,
            result.actual_min = ?actual_min,
            result.actual_max = ?actual_max,
            result.passed = passed,
            "Value range evaluated"
        );

        Ok(self.result(actual_min, actual_max, passed))
    }
}
