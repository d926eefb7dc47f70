//! The check library.
//!
//! Each check evaluates one quality dimension of one column through the
//! aggregate operations of a [`DatasetHandle`] and produces a [`CheckResult`].
//! Checks share an edge-case policy: when the population they measure is
//! empty they pass with zero or neutral quantities, so an empty table is never
//! reported as a quality failure.
//!
//! | Check | Population | Passes when |
//! |---|---|---|
//! | [`CompletenessCheck`] | all rows | null percentage ≤ threshold |
//! | [`UniquenessCheck`] | all rows | unique percentage ≥ threshold |
//! | [`ValueRangeCheck`] | non-null rows | observed min/max inside the bounds |
//! | [`PatternCheck`] | non-null rows | every value matches |
//! | [`ReferentialIntegrityCheck`] | non-null rows | no value missing from the reference |
//!
//! Checks are normally built from a [`CheckSpec`], which the dispatcher
//! resolves from a rule.

use crate::dataset::{DatasetHandle, DatasetProvider};
use crate::error::Result;
use crate::result::{CheckResult, CheckType};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

mod completeness;
mod pattern;
mod referential_integrity;
mod uniqueness;
mod value_range;

pub use completeness::CompletenessCheck;
pub use pattern::PatternCheck;
pub use referential_integrity::ReferentialIntegrityCheck;
pub use uniqueness::UniquenessCheck;
pub use value_range::ValueRangeCheck;

/// What a check needs to run: the dataset under test and a way to resolve
/// the other relations it refers to.
#[derive(Clone)]
pub struct EvaluationContext {
    dataset: Arc<dyn DatasetHandle>,
    provider: Arc<dyn DatasetProvider>,
}

impl EvaluationContext {
    pub fn new(dataset: Arc<dyn DatasetHandle>, provider: Arc<dyn DatasetProvider>) -> Self {
        Self { dataset, provider }
    }

    /// The dataset under test.
    pub fn dataset(&self) -> &Arc<dyn DatasetHandle> {
        &self.dataset
    }

    /// Resolver for reference datasets.
    pub fn provider(&self) -> &Arc<dyn DatasetProvider> {
        &self.provider
    }
}

/// A single data quality check over one column.
///
/// `Err` is reserved for unexpected failures (an engine error, a missing
/// column). Anticipated problems such as an unresolvable reference table are
/// reported as an `Ok` result carrying an error description.
#[async_trait]
pub trait QualityCheck: Debug + Send + Sync {
    /// The kind of check.
    fn check_type(&self) -> CheckType;

    /// The column the check measures.
    fn column(&self) -> &str;

    /// Evaluates the check.
    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<CheckResult>;
}

/// Fully resolved parameters for one check.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckSpec {
    Completeness {
        column: String,
        threshold: f64,
    },
    Uniqueness {
        column: String,
        threshold: f64,
    },
    ValueRange {
        column: String,
        min_value: Option<f64>,
        max_value: Option<f64>,
    },
    Pattern {
        column: String,
        pattern: String,
    },
    ReferentialIntegrity {
        column: String,
        ref_database: String,
        ref_table: String,
        ref_column: String,
    },
}

impl CheckSpec {
    pub fn check_type(&self) -> CheckType {
        match self {
            CheckSpec::Completeness { .. } => CheckType::Completeness,
            CheckSpec::Uniqueness { .. } => CheckType::Uniqueness,
            CheckSpec::ValueRange { .. } => CheckType::ValueRange,
            CheckSpec::Pattern { .. } => CheckType::Pattern,
            CheckSpec::ReferentialIntegrity { .. } => CheckType::ReferentialIntegrity,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            CheckSpec::Completeness { column, .. }
            | CheckSpec::Uniqueness { column, .. }
            | CheckSpec::ValueRange { column, .. }
            | CheckSpec::Pattern { column, .. }
            | CheckSpec::ReferentialIntegrity { column, .. } => column,
        }
    }

    /// Builds the check these parameters describe.
    pub fn into_check(self) -> Box<dyn QualityCheck> {
        match self {
            CheckSpec::Completeness { column, threshold } => {
                Box::new(CompletenessCheck::new(column, threshold))
            }
            CheckSpec::Uniqueness { column, threshold } => {
                Box::new(UniquenessCheck::new(column, threshold))
            }
            CheckSpec::ValueRange {
                column,
                min_value,
                max_value,
            } => Box::new(ValueRangeCheck::new(column, min_value, max_value)),
            CheckSpec::Pattern { column, pattern } => Box::new(PatternCheck::new(column, pattern)),
            CheckSpec::ReferentialIntegrity {
                column,
                ref_database,
                ref_table,
                ref_column,
            } => Box::new(ReferentialIntegrityCheck::new(
                column,
                ref_database,
                ref_table,
                ref_column,
            )),
        }
    }
}

/// `part` as a percentage of `whole`. Callers short-circuit empty populations
/// before dividing.
pub(crate) fn percentage(part: u64, whole: u64) -> f64 {
    part as f64 / whole as f64 * 100.0
}
