//! Monitor configuration.

use crate::dispatcher::{DEFAULT_CHECK_TIMEOUT, DEFAULT_SINK_TIMEOUT};
use crate::error::{MonitorError, Result};
use crate::security::{InputValidator, SecureString};
use crate::sinks::DEFAULT_NAMESPACE;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DATABASE: &str = "DQ_DATABASE";
pub const ENV_TABLE: &str = "DQ_TABLE";
pub const ENV_RULES_PATH: &str = "DQ_RULES_PATH";
pub const ENV_RESULTS_PATH: &str = "DQ_RESULTS_PATH";
pub const ENV_METRICS_NAMESPACE: &str = "DQ_METRICS_NAMESPACE";
pub const ENV_CHECK_TIMEOUT_SECS: &str = "DQ_CHECK_TIMEOUT_SECS";
pub const ENV_SINK_TIMEOUT_SECS: &str = "DQ_SINK_TIMEOUT_SECS";
pub const ENV_MAX_CONCURRENCY: &str = "DQ_MAX_CONCURRENCY";
pub const ENV_ALERT_DESTINATION: &str = "DATA_QUALITY_ALERT_DESTINATION";
pub const ENV_ALERT_SECRET: &str = "DATA_QUALITY_ALERT_SECRET";

/// Settings for one monitored table.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    database: String,
    table: String,
    rules_path: Option<PathBuf>,
    results_path: Option<PathBuf>,
    metrics_namespace: String,
    check_timeout: Duration,
    sink_timeout: Duration,
    max_concurrency: usize,
    alert_destination: Option<String>,
    alert_secret: Option<SecureString>,
}

impl MonitorConfig {
    /// Creates a configuration for `database.table` with default settings.
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            rules_path: None,
            results_path: None,
            metrics_namespace: DEFAULT_NAMESPACE.to_string(),
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            sink_timeout: DEFAULT_SINK_TIMEOUT,
            max_concurrency: 1,
            alert_destination: None,
            alert_secret: None,
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// `DQ_DATABASE` and `DQ_TABLE` are required. The alert destination is
    /// read from `DATA_QUALITY_ALERT_DESTINATION`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &str| {
            get(name).ok_or_else(|| {
                MonitorError::Configuration(format!("environment variable {name} is not set"))
            })
        };

        let mut config = Self::new(required(ENV_DATABASE)?, required(ENV_TABLE)?);
        if let Some(path) = get(ENV_RULES_PATH) {
            config = config.with_rules_path(path);
        }
        if let Some(path) = get(ENV_RESULTS_PATH) {
            config = config.with_results_path(path);
        }
        if let Some(namespace) = get(ENV_METRICS_NAMESPACE) {
            config = config.with_metrics_namespace(namespace);
        }
        if let Some(secs) = get(ENV_CHECK_TIMEOUT_SECS) {
            let secs = parse_number::<u64>(ENV_CHECK_TIMEOUT_SECS, &secs)?;
            config = config.with_check_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = get(ENV_SINK_TIMEOUT_SECS) {
            let secs = parse_number::<u64>(ENV_SINK_TIMEOUT_SECS, &secs)?;
            config = config.with_sink_timeout(Duration::from_secs(secs));
        }
        if let Some(n) = get(ENV_MAX_CONCURRENCY) {
            config = config.with_max_concurrency(parse_number(ENV_MAX_CONCURRENCY, &n)?);
        }
        if let Some(destination) = get(ENV_ALERT_DESTINATION) {
            config = config.with_alert_destination(destination);
        }
        if let Some(secret) = get(ENV_ALERT_SECRET) {
            config = config.with_alert_secret(secret);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_rules_path(mut self, path: impl AsRef<Path>) -> Self {
        self.rules_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_results_path(mut self, path: impl AsRef<Path>) -> Self {
        self.results_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_metrics_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.metrics_namespace = namespace.into();
        self
    }

    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    pub fn with_sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout = timeout;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_alert_destination(mut self, destination: impl Into<String>) -> Self {
        self.alert_destination = Some(destination.into());
        self
    }

    pub fn with_alert_secret(mut self, secret: impl Into<SecureString>) -> Self {
        self.alert_secret = Some(secret.into());
        self
    }

    /// Rejects settings the monitor cannot run with.
    pub fn validate(&self) -> Result<()> {
        InputValidator::validate_relation_name(&self.database, "database name")?;
        InputValidator::validate_relation_name(&self.table, "table name")?;
        if self.metrics_namespace.trim().is_empty() {
            return Err(MonitorError::Configuration(
                "metrics namespace cannot be empty".to_string(),
            ));
        }
        if self.check_timeout.is_zero() {
            return Err(MonitorError::Configuration(
                "check timeout must be greater than zero".to_string(),
            ));
        }
        if self.sink_timeout.is_zero() {
            return Err(MonitorError::Configuration(
                "sink timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(MonitorError::Configuration(
                "max concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn rules_path(&self) -> Option<&Path> {
        self.rules_path.as_deref()
    }

    pub fn results_path(&self) -> Option<&Path> {
        self.results_path.as_deref()
    }

    pub fn metrics_namespace(&self) -> &str {
        &self.metrics_namespace
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

    pub fn alert_destination(&self) -> Option<&str> {
        self.alert_destination.as_deref()
    }

    /// The webhook signing secret. Avoid storing or logging the exposed value.
    pub fn alert_secret(&self) -> Option<&SecureString> {
        self.alert_secret.as_ref()
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        MonitorError::Configuration(format!("{name} must be a non-negative integer, got '{value}'"))
    })
}
