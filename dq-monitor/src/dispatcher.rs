//! Rule dispatch.
//!
//! The [`RuleDispatcher`] turns an ordered list of rules into an ordered list
//! of results against one dataset. Every rule is isolated: a rule whose
//! parameters cannot be resolved, whose check fails inside the engine, or
//! which runs past its deadline produces a failed result carrying an error,
//! and the remaining rules are evaluated as usual. Rules with an unknown check
//! type are logged and skipped; they produce no result. Metrics and alert
//! deliveries run under their own deadline and never hold up the batch.

use crate::checks::EvaluationContext;
use crate::dataset::{DatasetHandle, DatasetProvider};
use crate::error::{MonitorError, Result};
use crate::logging::truncate_field;
use crate::result::{CheckResult, CheckType};
use crate::rules::{Rule, RuleKind};
use crate::sinks::{AlertAdapter, MetricsAdapter};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Per-check deadline used when none is configured.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(300);

/// Deadline for a single metrics or alert delivery.
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(30);

/// Evaluates rules against datasets and forwards the results to the sinks.
#[derive(Clone)]
pub struct RuleDispatcher {
    provider: Arc<dyn DatasetProvider>,
    metrics: Option<MetricsAdapter>,
    alerts: AlertAdapter,
    check_timeout: Duration,
    sink_timeout: Duration,
    max_concurrency: usize,
}

impl RuleDispatcher {
    /// Creates a dispatcher with no sinks, the default deadline and
    /// sequential evaluation.
    pub fn new(provider: Arc<dyn DatasetProvider>) -> Self {
        Self {
            provider,
            metrics: None,
            alerts: AlertAdapter::disabled(),
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            sink_timeout: DEFAULT_SINK_TIMEOUT,
            max_concurrency: 1,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsAdapter) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_alerts(mut self, alerts: AlertAdapter) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// Deadline for each sink call. A delivery that runs past it is dropped
    /// and the batch carries on.
    pub fn with_sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout = timeout;
        self
    }

    /// Number of rules evaluated at once. Values below 1 are treated as 1.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn check_timeout(&self) -> Duration {
        self.check_timeout
    }

    pub fn sink_timeout(&self) -> Duration {
        self.sink_timeout
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Evaluates `rules` against `dataset`.
    ///
    /// Returns one result per rule with a known check type, in rule order.
    #[instrument(skip(self, rules, dataset), fields(
        dataset = %dataset.name(),
        rules = rules.len(),
        concurrency = self.max_concurrency
    ))]
    pub async fn run(&self, rules: &[Rule], dataset: Arc<dyn DatasetHandle>) -> Vec<CheckResult> {
        let ctx = EvaluationContext::new(dataset, self.provider.clone());
        let known = known_rules(rules);

        let results: Vec<CheckResult> = stream::iter(known)
            .map(|(rule, check_type)| {
                let ctx = &ctx;
                async move { self.dispatch(rule, check_type, ctx).await }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| !r.passed).count();
        info!(checks = results.len(), failed, "Rules evaluated");
        results
    }

    /// Resolves `database.table` and evaluates `rules` against it.
    ///
    /// If the dataset cannot be resolved every rule with a known check type
    /// yields a failed result describing the problem.
    #[instrument(skip(self, rules), fields(rules = rules.len()))]
    pub async fn run_for_table(
        &self,
        rules: &[Rule],
        database: &str,
        table: &str,
    ) -> Vec<CheckResult> {
        match self.provider.dataset(database, table).await {
            Ok(dataset) => self.run(rules, dataset).await,
            Err(e) => {
                warn!(
                    database = %database,
                    table = %table,
                    error = %truncate_field(&e.to_string(), 256),
                    "Dataset unavailable, failing all rules"
                );
                let message = e.to_string();
                let mut results = Vec::new();
                for (rule, check_type) in known_rules(rules) {
                    let result = CheckResult::errored(check_type, &rule.column, &message);
                    results.push(self.finish(rule, result, database, table).await);
                }
                results
            }
        }
    }

    async fn dispatch(
        &self,
        rule: &Rule,
        check_type: CheckType,
        ctx: &EvaluationContext,
    ) -> CheckResult {
        let name = ctx.dataset().name().clone();
        let result = match self.evaluate(rule, ctx).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    rule_id = %rule.rule_id,
                    check_type = %rule.check_type,
                    error = %truncate_field(&e.to_string(), 256),
                    "Check failed to evaluate"
                );
                CheckResult::errored(check_type, &rule.column, e.to_string())
            }
        };
        self.finish(rule, result, &name.database, &name.table).await
    }

    async fn evaluate(&self, rule: &Rule, ctx: &EvaluationContext) -> Result<CheckResult> {
        let spec = rule.resolve()?;
        let check_type = spec.check_type();
        let check = spec.into_check();

        debug!(
            rule_id = %rule.rule_id,
            check_type = %check_type,
            column = %rule.column,
            "Evaluating rule"
        );
        match tokio::time::timeout(self.check_timeout, check.evaluate(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::Timeout {
                check: check_type.to_string(),
                timeout: self.check_timeout,
            }),
        }
    }

    async fn finish(
        &self,
        rule: &Rule,
        mut result: CheckResult,
        database: &str,
        table: &str,
    ) -> CheckResult {
        result.rule_id = Some(rule.rule_id.clone());
        result.rule_name = rule.rule_name.clone();
        result.rule_description = rule.rule_description.clone();
        result.severity = Some(rule.severity);

        if let Some(metrics) = &self.metrics {
            self.deliver("metrics", rule, metrics.publish(&result, database, table))
                .await;
        }
        if !result.passed && rule.alert {
            self.deliver("alert", rule, self.alerts.notify(&result, database, table))
                .await;
        }
        result
    }

    async fn deliver(&self, sink: &'static str, rule: &Rule, delivery: impl Future<Output = ()>) {
        if tokio::time::timeout(self.sink_timeout, delivery).await.is_err() {
            warn!(
                sink,
                rule_id = %rule.rule_id,
                timeout = ?self.sink_timeout,
                "Sink call timed out, dropping it"
            );
        }
    }
}

fn known_rules(rules: &[Rule]) -> impl Iterator<Item = (&Rule, CheckType)> {
    rules.iter().filter_map(|rule| match &rule.check_type {
        RuleKind::Known(check_type) => Some((rule, *check_type)),
        RuleKind::Unknown(name) => {
            warn!(rule_id = %rule.rule_id, check_type = %name, "Unknown check type, skipping rule");
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Severity;
    use crate::sinks::{InMemoryAlertSink, InMemoryMetricsSink};
    use crate::test_fixtures::{customers_batch, provider_with};

    fn dispatcher() -> (RuleDispatcher, Arc<InMemoryMetricsSink>, Arc<InMemoryAlertSink>) {
        let provider = Arc::new(provider_with(vec![("shop", "customers", customers_batch())]));
        let metrics = Arc::new(InMemoryMetricsSink::new());
        let alerts = Arc::new(InMemoryAlertSink::new());
        let dispatcher = RuleDispatcher::new(provider)
            .with_metrics(MetricsAdapter::new(metrics.clone(), "DataQuality"))
            .with_alerts(AlertAdapter::new(Some(alerts.clone())));
        (dispatcher, metrics, alerts)
    }

    #[tokio::test]
    async fn test_bad_rule_does_not_abort_batch() {
        let (dispatcher, _, _) = dispatcher();
        let rules = vec![
            Rule::new("R1", CheckType::Pattern, "email"),
            Rule::new("R2", CheckType::Uniqueness, "id"),
        ];

        let results = dispatcher.run_for_table(&rules, "shop", "customers").await;
        assert_eq!(results.len(), 2);

        assert!(!results[0].passed);
        assert!(results[0].is_error());
        assert!(results[0].measurements.is_none());
        assert_eq!(results[0].rule_id.as_deref(), Some("R1"));
        assert_eq!(results[0].check_type, CheckType::Pattern);

        assert!(results[1].passed);
        assert_eq!(results[1].rule_id.as_deref(), Some("R2"));
    }

    #[tokio::test]
    async fn test_unknown_check_type_is_skipped() {
        let (dispatcher, metrics, _) = dispatcher();
        let rules = vec![
            Rule::new("R1", RuleKind::Unknown("freshness".to_string()), "email"),
            Rule::new("R2", CheckType::Completeness, "id"),
        ];

        let results = dispatcher.run_for_table(&rules, "shop", "customers").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rule_id.as_deref(), Some("R2"));
        assert_eq!(metrics.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_metadata_is_attached() {
        let (dispatcher, _, _) = dispatcher();
        let rules = vec![Rule::new("R1", CheckType::Completeness, "email")
            .with_name("Email present")
            .with_description("Emails should be filled in")
            .with_severity(Severity::High)
            .with_threshold(50.0)];

        let results = dispatcher.run_for_table(&rules, "shop", "customers").await;
        let result = &results[0];
        assert!(result.passed);
        assert_eq!(result.rule_name.as_deref(), Some("Email present"));
        assert_eq!(
            result.rule_description.as_deref(),
            Some("Emails should be filled in")
        );
        assert_eq!(result.severity, Some(Severity::High));
    }

    #[tokio::test]
    async fn test_alert_only_for_failed_alerting_rules() {
        let (dispatcher, metrics, alerts) = dispatcher();
        let rules = vec![
            // fails, alerts
            Rule::new("R1", CheckType::Completeness, "email").with_alert(true),
            // fails, no alert flag
            Rule::new("R2", CheckType::Completeness, "email"),
            // passes, alert flag set
            Rule::new("R3", CheckType::Uniqueness, "id").with_alert(true),
        ];

        let results = dispatcher.run_for_table(&rules, "shop", "customers").await;
        assert_eq!(results.len(), 3);

        let sent = alerts.notifications();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message.rule_id.as_deref(), Some("R1"));
        assert_eq!(metrics.batches().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_dataset_fails_every_rule() {
        let (dispatcher, metrics, _) = dispatcher();
        let rules = vec![
            Rule::new("R1", CheckType::Completeness, "email"),
            Rule::new("R2", RuleKind::Unknown("freshness".to_string()), "email"),
            Rule::new("R3", CheckType::Uniqueness, "id"),
        ];

        let results = dispatcher.run_for_table(&rules, "shop", "ghost").await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_error() && !r.passed));
        assert!(results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("shop.ghost"));

        let points = metrics.points();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.name == "CheckPassed" && p.value == 0.0));
    }

    #[tokio::test]
    async fn test_concurrent_evaluation_preserves_order() {
        let (dispatcher, _, _) = dispatcher();
        let dispatcher = dispatcher.with_max_concurrency(4);
        let rules: Vec<Rule> = (0..12)
            .map(|i| {
                let kind = CheckType::ALL[i % 4];
                let rule = Rule::new(format!("R{i}"), kind, "id");
                if kind == CheckType::Pattern {
                    rule.with_pattern(r"^\d+$")
                } else {
                    rule
                }
            })
            .collect();

        let results = dispatcher.run_for_table(&rules, "shop", "customers").await;
        let ids: Vec<_> = results.iter().map(|r| r.rule_id.clone().unwrap()).collect();
        let expected: Vec<_> = (0..12).map(|i| format!("R{i}")).collect();
        assert_eq!(ids, expected);
        assert!(results.iter().all(|r| r.passed));
    }
}
