//! Alert notifications for failed rules.

use super::error::SinkResult;
use crate::logging::truncate_field;
use crate::result::{CheckResult, CheckType, Severity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// The structured body of an alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertMessage {
    pub database: String,
    pub table: String,
    pub rule_id: Option<String>,
    pub rule_name: Option<String>,
    pub check_type: CheckType,
    pub column: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    /// The full result that triggered the alert.
    pub details: CheckResult,
}

/// A notification for one failed result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertNotification {
    pub subject: String,
    pub message: AlertMessage,
}

impl AlertNotification {
    pub fn from_result(result: &CheckResult, database: &str, table: &str) -> Self {
        let rule_name = result.rule_name.as_deref().unwrap_or("Unknown Rule");
        Self {
            subject: format!("Data Quality Alert: {rule_name}"),
            message: AlertMessage {
                database: database.to_string(),
                table: table.to_string(),
                rule_id: result.rule_id.clone(),
                rule_name: result.rule_name.clone(),
                check_type: result.check_type,
                column: result.column.clone(),
                severity: result.severity.unwrap_or_default(),
                timestamp: result.timestamp,
                details: result.clone(),
            },
        }
    }

    /// The message rendered as pretty-printed JSON.
    pub fn body(&self) -> SinkResult<String> {
        Ok(serde_json::to_string_pretty(&self.message)?)
    }
}

/// A destination for alert notifications.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn publish(&self, notification: &AlertNotification) -> SinkResult<()>;
}

/// Turns failed results into notifications.
///
/// Without a configured sink every notification is dropped with a warning.
/// Delivery failures are logged and never returned.
#[derive(Clone, Default)]
pub struct AlertAdapter {
    sink: Option<Arc<dyn AlertSink>>,
}

impl AlertAdapter {
    pub fn new(sink: Option<Arc<dyn AlertSink>>) -> Self {
        Self { sink }
    }

    /// An adapter with no destination.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Sends an alert for `result`.
    pub async fn notify(&self, result: &CheckResult, database: &str, table: &str) {
        let Some(sink) = &self.sink else {
            warn!(
                rule_id = result.rule_id.as_deref().unwrap_or_default(),
                "No alert destination configured, skipping alert"
            );
            return;
        };

        let notification = AlertNotification::from_result(result, database, table);
        match sink.publish(&notification).await {
            Ok(()) => info!(
                rule_id = result.rule_id.as_deref().unwrap_or_default(),
                severity = %notification.message.severity,
                "Alert sent"
            ),
            Err(e) => error!(
                rule_id = result.rule_id.as_deref().unwrap_or_default(),
                retryable = e.is_retryable(),
                error = %truncate_field(&e.to_string(), 256),
                "Failed to send alert"
            ),
        }
    }
}

/// Writes alerts to the log at `warn` level.
#[derive(Debug, Clone)]
pub struct TracingAlertSink {
    destination: String,
}

impl TracingAlertSink {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn publish(&self, notification: &AlertNotification) -> SinkResult<()> {
        let body = notification.body()?;
        warn!(
            alert.destination = %self.destination,
            alert.subject = %notification.subject,
            alert.body = %body,
            "alert"
        );
        Ok(())
    }
}

/// Keeps every published notification in memory.
#[derive(Debug, Default)]
pub struct InMemoryAlertSink {
    notifications: Mutex<Vec<AlertNotification>>,
}

impl InMemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<AlertNotification> {
        self.notifications
            .lock()
            .map(|notifications| notifications.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AlertSink for InMemoryAlertSink {
    async fn publish(&self, notification: &AlertNotification) -> SinkResult<()> {
        self.notifications
            .lock()
            .map_err(|_| super::SinkError::Unavailable {
                message: "alert buffer lock poisoned".to_string(),
            })?
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Measurements;

    fn failed_result() -> CheckResult {
        let mut result = CheckResult::measured(
            "id",
            Measurements::Uniqueness {
                threshold: 100.0,
                unique_count: 98,
                total_count: 100,
                unique_percentage: 98.0,
            },
            false,
        );
        result.rule_id = Some("R2".to_string());
        result.rule_name = Some("Unique ids".to_string());
        result.severity = Some(Severity::High);
        result
    }

    #[test]
    fn test_notification_from_result() {
        let notification = AlertNotification::from_result(&failed_result(), "sales", "customers");
        assert_eq!(notification.subject, "Data Quality Alert: Unique ids");
        assert_eq!(notification.message.severity, Severity::High);
        assert_eq!(notification.message.rule_id.as_deref(), Some("R2"));

        let body: serde_json::Value =
            serde_json::from_str(&notification.body().unwrap()).unwrap();
        assert_eq!(body["database"], "sales");
        assert_eq!(body["check_type"], "uniqueness");
        assert_eq!(body["details"]["unique_percentage"], 98.0);
        assert_eq!(body["details"]["passed"], false);
    }

    #[test]
    fn test_unnamed_rule_subject() {
        let mut result = failed_result();
        result.rule_name = None;
        result.severity = None;
        let notification = AlertNotification::from_result(&result, "db", "t");
        assert_eq!(notification.subject, "Data Quality Alert: Unknown Rule");
        assert_eq!(notification.message.severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_adapter_without_destination_is_noop() {
        let adapter = AlertAdapter::disabled();
        assert!(!adapter.is_enabled());
        adapter.notify(&failed_result(), "db", "t").await;
    }

    #[tokio::test]
    async fn test_adapter_publishes() {
        let sink = Arc::new(InMemoryAlertSink::new());
        let adapter = AlertAdapter::new(Some(sink.clone()));
        adapter.notify(&failed_result(), "db", "t").await;
        assert_eq!(sink.notifications().len(), 1);
    }
}
