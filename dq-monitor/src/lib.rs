//! # dq-monitor - Rule-driven data quality monitoring
//!
//! dq-monitor evaluates a declarative set of data quality rules against a
//! table, turns each rule's outcome into a structured [`CheckResult`], forwards
//! metrics and failure alerts to monitoring backends, and summarizes the batch
//! in a [`Report`]. Queries run on DataFusion.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dq_monitor::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> dq_monitor::error::Result<()> {
//! let provider = DataFusionProvider::default();
//! provider
//!     .register_file("sales", "customers", std::path::Path::new("customers.csv"))
//!     .await?;
//!
//! let rules = RuleSet::from_yaml_str(
//!     r#"
//! - rule_id: R1
//!   rule_name: Email completeness
//!   check_type: completeness
//!   column: email
//!   threshold: 5
//! - rule_id: R2
//!   check_type: uniqueness
//!   column: id
//!   alert: true
//! "#,
//! )?;
//!
//! let monitor = DataQualityMonitor::new(
//!     MonitorConfig::new("sales", "customers"),
//!     Arc::new(provider),
//! )?;
//! let run = monitor.run_with_rules(rules.rules()).await;
//!
//! if let Some(report) = run.report.report() {
//!     println!("{:.1}% of checks passed", report.summary.pass_percentage);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Checks
//!
//! - **Completeness**: share of NULL values stays at or below a threshold
//! - **Uniqueness**: share of distinct values reaches a threshold
//! - **Value range**: observed minimum and maximum stay inside bounds
//! - **Pattern**: every non-null value matches a regular expression
//! - **Referential integrity**: every value exists in a reference column
//!
//! An empty population never fails a check.
//!
//! ## Failure containment
//!
//! One bad rule never aborts a batch. Rules with unusable parameters, checks
//! that fail inside the engine, checks that exceed their deadline and tables
//! that cannot be resolved all become failed results carrying an `error`.
//! Metric, alert and persistence failures are logged and swallowed. Only a
//! rule document that cannot be loaded stops a run.
//!
//! ## Architecture
//!
//! - **`result`**: the uniform result record
//! - **`dataset`**: the handle and provider traits, and the DataFusion engine
//! - **`checks`**: the five check implementations
//! - **`rules`**: rule records and rule documents (JSON or YAML)
//! - **`dispatcher`**: rule evaluation with isolation, deadlines and concurrency
//! - **`sinks`**: metric and alert adapters
//! - **`report`**: result aggregation
//! - **`repository`**: result persistence
//! - **`monitor`**: the end-to-end run
//!
//! [`CheckResult`]: result::CheckResult
//! [`Report`]: report::Report

pub mod checks;
pub mod config;
pub mod dataset;
pub mod dispatcher;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod monitor;
pub mod prelude;
pub mod report;
pub mod repository;
pub mod result;
pub mod rules;
pub mod security;
pub mod sinks;

#[cfg(test)]
pub(crate) mod test_fixtures;
