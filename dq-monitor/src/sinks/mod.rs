//! Adapters that forward results to metrics and alerting backends.
//!
//! Translation is pure ([`metric_points`], [`AlertNotification::from_result`]);
//! delivery goes through the [`MetricsSink`] and [`AlertSink`] traits. The
//! adapters log delivery failures and never return them, so a broken backend
//! cannot change check outcomes.

mod alert;
mod error;
mod metrics;
#[cfg(feature = "webhook")]
mod webhook;

pub use alert::{
    AlertAdapter, AlertMessage, AlertNotification, AlertSink, InMemoryAlertSink, TracingAlertSink,
};
pub use error::{SinkError, SinkResult};
pub use metrics::{
    metric_points, Dimension, InMemoryMetricsSink, MetricPoint, MetricUnit, MetricsAdapter,
    MetricsSink, TracingMetricsSink, DEFAULT_NAMESPACE,
};
#[cfg(feature = "webhook")]
pub use webhook::{WebhookAlertSink, WebhookConfig};
