//! End-to-end evaluation of one table.

use crate::config::MonitorConfig;
use crate::dataset::DatasetProvider;
use crate::dispatcher::RuleDispatcher;
use crate::error::{MonitorError, Result};
use crate::logging::truncate_field;
use crate::report::{generate_report, ReportOutcome};
use crate::repository::{FileResultStore, ResultKey, ResultStore};
use crate::result::CheckResult;
use crate::rules::{Rule, RuleSet};
use crate::sinks::{AlertAdapter, AlertSink, MetricsAdapter, MetricsSink, TracingMetricsSink};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorRun {
    pub results: Vec<CheckResult>,
    pub report: ReportOutcome,
}

impl MonitorRun {
    /// True when every check passed and the report was built.
    pub fn all_passed(&self) -> bool {
        self.report.report().is_some_and(|report| report.all_passed())
    }
}

/// Runs a rule set against the configured table.
///
/// ```rust,no_run
/// use dq_monitor::prelude::*;
/// use std::sync::Arc;
///
/// # async fn example() -> dq_monitor::error::Result<()> {
/// let provider = DataFusionProvider::default();
/// provider
///     .register_file("sales", "orders", std::path::Path::new("orders.parquet"))
///     .await?;
///
/// let config = MonitorConfig::new("sales", "orders").with_rules_path("rules.yaml");
/// let monitor = DataQualityMonitor::new(config, Arc::new(provider))?;
/// let run = monitor.run().await?;
/// println!("all passed: {}", run.all_passed());
/// # Ok(())
/// # }
/// ```
pub struct DataQualityMonitor {
    config: MonitorConfig,
    dispatcher: RuleDispatcher,
    store: Option<Arc<dyn ResultStore>>,
}

impl DataQualityMonitor {
    /// Wires a monitor from `config`.
    ///
    /// Metrics go to the log, alerts go to the configured destination (see
    /// [`alert_sink_from_config`]) and results are written under the results
    /// path when one is set. Each collaborator can be replaced afterwards.
    pub fn new(config: MonitorConfig, provider: Arc<dyn DatasetProvider>) -> Result<Self> {
        config.validate()?;

        let dispatcher = RuleDispatcher::new(provider)
            .with_check_timeout(config.check_timeout())
            .with_sink_timeout(config.sink_timeout())
            .with_max_concurrency(config.max_concurrency())
            .with_metrics(MetricsAdapter::new(
                Arc::new(TracingMetricsSink),
                config.metrics_namespace(),
            ))
            .with_alerts(AlertAdapter::new(alert_sink_from_config(&config)?));

        let store = config
            .results_path()
            .map(|path| Arc::new(FileResultStore::new(path)) as Arc<dyn ResultStore>);

        Ok(Self {
            config,
            dispatcher,
            store,
        })
    }

    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.dispatcher = self.dispatcher.with_metrics(MetricsAdapter::new(
            sink,
            self.config.metrics_namespace(),
        ));
        self
    }

    pub fn with_alert_sink(mut self, sink: Option<Arc<dyn AlertSink>>) -> Self {
        self.dispatcher = self.dispatcher.with_alerts(AlertAdapter::new(sink));
        self
    }

    pub fn with_result_store(mut self, store: Option<Arc<dyn ResultStore>>) -> Self {
        self.store = store;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Loads the configured rule document and runs it.
    ///
    /// Failing to load the rules is the only error this returns.
    #[instrument(skip(self), fields(
        database = %self.config.database(),
        table = %self.config.table()
    ))]
    pub async fn run(&self) -> Result<MonitorRun> {
        let path = self.config.rules_path().ok_or_else(|| {
            MonitorError::rule_source("no rules path configured")
        })?;
        let rules = RuleSet::from_path(path)?;
        Ok(self.run_with_rules(rules.rules()).await)
    }

    /// Runs `rules` against the configured table.
    #[instrument(skip(self, rules), fields(
        database = %self.config.database(),
        table = %self.config.table(),
        rules = rules.len()
    ))]
    pub async fn run_with_rules(&self, rules: &[Rule]) -> MonitorRun {
        let database = self.config.database();
        let table = self.config.table();

        let results = self.dispatcher.run_for_table(rules, database, table).await;

        if let Some(store) = &self.store {
            let key = ResultKey::now(database, table);
            if let Err(e) = store.save(&key, &results).await {
                error!(
                    key = %key,
                    error = %truncate_field(&e.to_string(), 256),
                    "Failed to save results"
                );
            }
        }

        let report = generate_report(&results, database, table);
        if let Some(summary) = report.report().map(|r| &r.summary) {
            info!(
                total = summary.total_checks,
                passed = summary.passed_checks,
                failed = summary.failed_checks,
                errors = summary.error_checks,
                pass_percentage = summary.pass_percentage,
                "Data quality run complete"
            );
        }

        MonitorRun { results, report }
    }
}

/// Builds the alert sink for the configured destination.
///
/// With the `webhook` feature an `http(s)://` destination is delivered by
/// webhook (signed when a secret is configured); any other destination is
/// written to the log. No destination means no sink.
pub fn alert_sink_from_config(config: &MonitorConfig) -> Result<Option<Arc<dyn AlertSink>>> {
    let Some(destination) = config.alert_destination() else {
        return Ok(None);
    };

    #[cfg(feature = "webhook")]
    {
        let lower = destination.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let mut webhook = crate::sinks::WebhookConfig::new(destination);
            if let Some(secret) = config.alert_secret() {
                webhook = webhook.with_secret(secret.clone());
            }
            let sink = crate::sinks::WebhookAlertSink::new(webhook)
                .map_err(|e| MonitorError::Configuration(e.to_string()))?;
            return Ok(Some(Arc::new(sink)));
        }
    }

    Ok(Some(Arc::new(crate::sinks::TracingAlertSink::new(destination))))
}
