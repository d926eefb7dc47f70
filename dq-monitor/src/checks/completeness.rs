//! Completeness: the share of missing values in a column.

use super::{percentage, EvaluationContext, QualityCheck};
use crate::error::Result;
use crate::result::{CheckResult, CheckType, Measurements};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Passes when the percentage of NULL (or NaN) values in `column` is at most
/// `threshold`.
///
/// The percentage is taken over all rows, missing ones included.
///
/// ```rust
/// use dq_monitor::checks::CompletenessCheck;
///
/// // At most 5% of emails may be missing
/// let check = CompletenessCheck::new("email", 5.0);
/// ```
#[derive(Debug, Clone)]
pub struct CompletenessCheck {
    column: String,
    threshold: f64,
}

impl CompletenessCheck {
    pub fn new(column: impl Into<String>, threshold: f64) -> Self {
        Self {
            column: column.into(),
            threshold,
        }
    }
}

#[async_trait]
impl QualityCheck for CompletenessCheck {
    fn check_type(&self) -> CheckType {
        CheckType::Completeness
    }

    fn column(&self) -> &str {
        &self.column
    }

    #[instrument(skip(self, ctx), fields(
        check.column = %self.column,
        check.threshold = %self.threshold
    ))]
    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<CheckResult> {
        let dataset = ctx.dataset();
        let total_count = dataset.row_count().await?;

        if total_count == 0 {
            debug!(check.column = %self.column, data.rows = 0, "Empty dataset, passing");
            return Ok(CheckResult::measured(
                &self.column,
                Measurements::Completeness {
                    threshold: self.threshold,
                    null_count: 0,
                    total_count: 0,
                    null_percentage: 0.0,
                },
                true,
            ));
        }

        let null_count = dataset.null_count(&self.column).await?;
        let null_percentage = percentage(null_count, total_count);
        let passed = null_percentage <= self.threshold;

        debug!(
            check.column = %self.column,
            data.rows = total_count,
            data.nulls = null_count,
            result.null_percentage = null_percentage,
            result.passed = passed,
            "Completeness evaluated"
        );

        Ok(CheckResult::measured(
            &self.column,
            Measurements::Completeness {
                threshold: self.threshold,
                null_count,
                total_count,
                null_percentage,
            },
            passed,
        ))
    }
}
