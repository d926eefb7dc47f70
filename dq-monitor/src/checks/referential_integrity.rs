//! Referential integrity between a column and a column of another table.

use super::{percentage, EvaluationContext, QualityCheck};
use crate::error::Result;
use crate::result::{CheckResult, CheckType, Measurements};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Passes when every distinct non-null value of `column` occurs in
/// `ref_database.ref_table.ref_column`.
///
/// `invalid_count` is the number of distinct values missing from the
/// reference, and `valid_percentage` relates it to the number of non-null
/// rows. When the reference table cannot be resolved the check fails with an
/// error and leaves the counts unset, so the failure is distinguishable from
/// orphaned values.
#[derive(Debug, Clone)]
pub struct ReferentialIntegrityCheck {
    column: String,
    ref_database: String,
    ref_table: String,
    ref_column: String,
}

impl ReferentialIntegrityCheck {
    pub fn new(
        column: impl Into<String>,
        ref_database: impl Into<String>,
        ref_table: impl Into<String>,
        ref_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            ref_database: ref_database.into(),
            ref_table: ref_table.into(),
            ref_column: ref_column.into(),
        }
    }

    fn result(
        &self,
        invalid_count: Option<u64>,
        total_count: Option<u64>,
        valid_percentage: Option<f64>,
        passed: bool,
    ) -> CheckResult {
        CheckResult::measured(
            &self.column,
            Measurements::ReferentialIntegrity {
                ref_database: self.ref_database.clone(),
                ref_table: self.ref_table.clone(),
                ref_column: self.ref_column.clone(),
                invalid_count,
                total_count,
                valid_percentage,
            },
            passed,
        )
    }
}

#[async_trait]
impl QualityCheck for ReferentialIntegrityCheck {
    fn check_type(&self) -> CheckType {
        CheckType::ReferentialIntegrity
    }

    fn column(&self) -> &str {
        &self.column
    }

    #[instrument(skip(self, ctx), fields(
        check.column = %self.column,
        check.reference = %format!("{}.{}.{}", self.ref_database, self.ref_table, self.ref_column)
    ))]
    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<CheckResult> {
        let reference = match ctx
            .provider()
            .dataset(&self.ref_database, &self.ref_table)
            .await
        {
            Ok(reference) => reference,
            Err(e) => {
                warn!(
                    check.column = %self.column,
                    error = %e,
                    "Reference dataset unavailable"
                );
                return Ok(self.result(None, None, None, false).with_error(e.to_string()));
            }
        };

        let non_null = ctx.dataset().filter_not_null(&self.column)?;
        let total_count = non_null.row_count().await?;
        if total_count == 0 {
            debug!(check.column = %self.column, "No non-null values, passing");
            return Ok(self.result(Some(0), Some(0), Some(100.0), true));
        }

        let invalid_count = non_null
            .anti_join_count(&self.column, reference.as_ref(), &self.ref_column)
            .await?;
        let valid_percentage = percentage(total_count.saturating_sub(invalid_count), total_count);
        let passed = invalid_count == 0;

        debug!(
            check.column = %self.column,
            data.rows = total_count,
            data.invalid = invalid_count,
            result.passed = passed,
            "Referential integrity evaluated"
        );

        Ok(self.result(
            Some(invalid_count),
            Some(total_count),
            Some(valid_percentage),
            passed,
        ))
    }
}
