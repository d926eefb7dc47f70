//! Uniqueness: the share of distinct values in a column.

use super::{percentage, EvaluationContext, QualityCheck};
use crate::error::Result;
use crate::result::{CheckResult, CheckType, Measurements};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Passes when distinct values make up at least `threshold` percent of all
/// rows. NULL counts as one distinct value.
#[derive(Debug, Clone)]
pub struct UniquenessCheck {
    column: String,
    threshold: f64,
}

impl UniquenessCheck {
    pub fn new(column: impl Into<String>, threshold: f64) -> Self {
        Self {
            column: column.into(),
            threshold,
        }
    }
}

#[async_trait]
impl QualityCheck for UniquenessCheck {
    fn check_type(&self) -> CheckType {
        CheckType::Uniqueness
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

        let (unique_count, unique_percentage, passed) = if total_count == 0 {
            debug!(check.column = %self.column, data.rows = 0, "Empty dataset, passing");
            (0, 0.0, true)
        } else {
            let unique_count = dataset.distinct_count(&self.column).await?;
            let unique_percentage = percentage(unique_count, total_count);
            (
                unique_count,
                unique_percentage,
                unique_percentage >= self.threshold,
            )
        };

        debug!(
            check.column = %self.column,
            data.rows = total_count,
            data.distinct = unique_count,
            result.passed = passed,
            "Uniqueness evaluated"
        );

        Ok(CheckResult::measured(
            &self.column,
            Measurements::Uniqueness {
                threshold: self.threshold,
                unique_count,
                total_count,
                unique_percentage,
            },
            passed,
        ))
    }
}
