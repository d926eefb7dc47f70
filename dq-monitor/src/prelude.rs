//! Prelude for commonly used types and traits in dq-monitor.

pub use crate::checks::{CheckSpec, EvaluationContext, QualityCheck};
pub use crate::config::MonitorConfig;
pub use crate::dataset::{DataFusionProvider, DatasetHandle, DatasetProvider, TableName};
pub use crate::dispatcher::RuleDispatcher;
pub use crate::error::{ErrorContext, MonitorError, Result};
pub use crate::formatters::{HumanFormatter, JsonFormatter, ReportFormatter};
pub use crate::monitor::{DataQualityMonitor, MonitorRun};
pub use crate::report::{generate_report, Report, ReportOutcome};
pub use crate::repository::{FileResultStore, ResultKey, ResultStore};
pub use crate::result::{CheckResult, CheckType, Measurements, Severity};
pub use crate::rules::{Rule, RuleKind, RuleSet};
pub use crate::sinks::{AlertAdapter, AlertSink, MetricsAdapter, MetricsSink};
