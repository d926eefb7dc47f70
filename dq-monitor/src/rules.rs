//! Declarative rules and rule documents.
//!
//! A rule selects a check, its target column and its parameters. Rules are
//! loaded leniently: every check parameter is optional at load time and is
//! only resolved into a typed [`CheckSpec`] when the rule is dispatched, so a
//! rule with bad parameters fails on its own instead of rejecting the whole
//! document.
//!
//! Rule documents are JSON or YAML, either a top-level list of rules or an
//! object with a `rules` list:
//!
//! ```yaml
//! rules:
//!   - rule_id: R1
//!     rule_name: Email completeness
//!     check_type: completeness
//!     column: email
//!     threshold: 5
//!     alert: true
//! ```

use crate::checks::CheckSpec;
use crate::error::{MonitorError, Result};
use crate::result::{CheckType, Severity};
use crate::security::InputValidator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::{debug, instrument, warn};

const DEFAULT_COMPLETENESS_THRESHOLD: f64 = 0.0;
const DEFAULT_UNIQUENESS_THRESHOLD: f64 = 100.0;

/// The `check_type` of a rule as written in the document.
///
/// Unrecognized names are kept so they can be reported and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleKind {
    Known(CheckType),
    Unknown(String),
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Known(kind) => write!(f, "{kind}"),
            RuleKind::Unknown(name) => f.write_str(name),
        }
    }
}

impl From<CheckType> for RuleKind {
    fn from(kind: CheckType) -> Self {
        RuleKind::Known(kind)
    }
}

/// A single data quality rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_description: Option<String>,
    pub check_type: RuleKind,
    pub column: String,
    #[serde(default)]
    pub severity: Severity,
    /// Whether a failure of this rule should raise an alert.
    #[serde(default)]
    pub alert: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_column: Option<String>,

    /// Set when the document entry could not be read as a rule.
    #[serde(skip)]
    rejected: Option<String>,
}

impl Rule {
    /// Creates a rule with no parameters set.
    pub fn new(
        rule_id: impl Into<String>,
        check_type: impl Into<RuleKind>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: None,
            rule_description: None,
            check_type: check_type.into(),
            column: column.into(),
            severity: Severity::default(),
            alert: false,
            threshold: None,
            min_value: None,
            max_value: None,
            pattern: None,
            ref_database: None,
            ref_table: None,
            ref_column: None,
            rejected: None,
        }
    }

    /// Reads the rule at `index` of a document.
    ///
    /// An entry that does not deserialize still becomes a rule, built from
    /// whatever identifying fields can be read, so that it reports its own
    /// failure when dispatched.
    fn from_entry(index: usize, entry: &Value) -> Self {
        match Rule::deserialize(entry) {
            Ok(rule) => rule,
            Err(e) => {
                let text = |key: &str| entry.get(key).and_then(text_value);
                let rule = Self {
                    rule_name: text("rule_name"),
                    rule_description: text("rule_description"),
                    severity: entry
                        .get("severity")
                        .and_then(|v| Severity::deserialize(v).ok())
                        .unwrap_or_default(),
                    alert: entry.get("alert").and_then(Value::as_bool).unwrap_or(false),
                    rejected: Some(format!("malformed rule: {e}")),
                    ..Self::new(
                        text("rule_id").unwrap_or_else(|| format!("rule[{index}]")),
                        entry
                            .get("check_type")
                            .and_then(|v| RuleKind::deserialize(v).ok())
                            .unwrap_or_else(|| RuleKind::Unknown("<missing>".to_string())),
                        text("column").unwrap_or_default(),
                    )
                };
                warn!(
                    index,
                    rule_id = %rule.rule_id,
                    error = %e,
                    "Malformed rule entry"
                );
                rule
            }
        }
    }

    /// Why the rule was rejected at load time, if it was.
    pub fn rejection(&self) -> Option<&str> {
        self.rejected.as_deref()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.rule_name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.rule_description = Some(description.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_alert(mut self, alert: bool) -> Self {
        self.alert = alert;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_range(mut self, min_value: Option<f64>, max_value: Option<f64>) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_reference(
        mut self,
        database: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.ref_database = Some(database.into());
        self.ref_table = Some(table.into());
        self.ref_column = Some(column.into());
        self
    }

    /// The check type, if it is one the monitor knows.
    pub fn known_check_type(&self) -> Option<CheckType> {
        match &self.check_type {
            RuleKind::Known(kind) => Some(*kind),
            RuleKind::Unknown(_) => None,
        }
    }

    /// Resolves the rule's parameters into a [`CheckSpec`], applying defaults.
    ///
    /// Fails with [`MonitorError::InvalidRule`] when the entry was malformed,
    /// the check type is unknown or a required parameter is missing or
    /// unusable.
    pub fn resolve(&self) -> Result<CheckSpec> {
        if let Some(reason) = &self.rejected {
            return Err(self.invalid(reason));
        }
        let kind = self.known_check_type().ok_or_else(|| {
            self.invalid(format!("unknown check type '{}'", self.check_type))
        })?;
        InputValidator::validate_column_name(&self.column).map_err(|e| self.invalid(e))?;
        let column = self.column.clone();

        let spec = match kind {
            CheckType::Completeness => CheckSpec::Completeness {
                column,
                threshold: self.threshold_or(DEFAULT_COMPLETENESS_THRESHOLD)?,
            },
            CheckType::Uniqueness => CheckSpec::Uniqueness {
                column,
                threshold: self.threshold_or(DEFAULT_UNIQUENESS_THRESHOLD)?,
            },
            CheckType::ValueRange => {
                for (value, name) in [(self.min_value, "min_value"), (self.max_value, "max_value")] {
                    if let Some(value) = value {
                        InputValidator::validate_finite(value, name).map_err(|e| self.invalid(e))?;
                    }
                }
                if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
                    if min > max {
                        return Err(self.invalid(format!(
                            "min_value {min} is greater than max_value {max}"
                        )));
                    }
                }
                CheckSpec::ValueRange {
                    column,
                    min_value: self.min_value,
                    max_value: self.max_value,
                }
            }
            CheckType::Pattern => {
                let pattern = self.required(&self.pattern, "pattern")?;
                InputValidator::validate_regex_pattern(pattern).map_err(|e| self.invalid(e))?;
                CheckSpec::Pattern {
                    column,
                    pattern: pattern.to_string(),
                }
            }
            CheckType::ReferentialIntegrity => {
                let ref_database = self.required(&self.ref_database, "ref_database")?;
                let ref_table = self.required(&self.ref_table, "ref_table")?;
                let ref_column = self.required(&self.ref_column, "ref_column")?;
                InputValidator::validate_relation_name(ref_database, "ref_database")
                    .map_err(|e| self.invalid(e))?;
                InputValidator::validate_relation_name(ref_table, "ref_table")
                    .map_err(|e| self.invalid(e))?;
                InputValidator::validate_column_name(ref_column).map_err(|e| self.invalid(e))?;
                CheckSpec::ReferentialIntegrity {
                    column,
                    ref_database: ref_database.to_string(),
                    ref_table: ref_table.to_string(),
                    ref_column: ref_column.to_string(),
                }
            }
        };
        Ok(spec)
    }

    fn threshold_or(&self, default: f64) -> Result<f64> {
        let threshold = self.threshold.unwrap_or(default);
        InputValidator::validate_finite(threshold, "threshold").map_err(|e| self.invalid(e))?;
        Ok(threshold)
    }

    fn required<'a>(&self, value: &'a Option<String>, name: &str) -> Result<&'a str> {
        match value.as_deref() {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(self.invalid(format!(
                "{} check requires '{name}'",
                self.check_type
            ))),
        }
    }

    fn invalid(&self, message: impl fmt::Display) -> MonitorError {
        MonitorError::invalid_rule(&self.rule_id, message.to_string())
    }
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Splits a parsed document into rules, one per entry.
fn document_rules(document: Value, format: &str) -> Result<Vec<Rule>> {
    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("rules") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(MonitorError::rule_source(format!(
                    "{format} rule document has no 'rules' list"
                )))
            }
        },
        _ => {
            return Err(MonitorError::rule_source(format!(
                "{format} rule document must be a list of rules or an object with a 'rules' list"
            )))
        }
    };
    Ok(entries
        .iter()
        .enumerate()
        .map(|(index, entry)| Rule::from_entry(index, entry))
        .collect())
}

/// An ordered set of rules loaded from a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Parses a JSON rule document.
    ///
    /// Only a document that is not valid JSON, or not shaped as a list of
    /// rules, is an error. Malformed entries are kept and fail on their own
    /// when dispatched.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(input).map_err(|e| {
            MonitorError::rule_source_with_source("invalid JSON rule document", Box::new(e))
        })?;
        document_rules(document, "JSON").map(Self::new)
    }

    /// Parses a YAML rule document, with the same leniency as
    /// [`RuleSet::from_json_str`].
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(input).map_err(|e| {
            MonitorError::rule_source_with_source("invalid YAML rule document", Box::new(e))
        })?;
        document_rules(document, "YAML").map(Self::new)
    }

    /// Loads a rule document, choosing the format from the file extension
    /// (`.json`, `.yaml` or `.yml`).
    #[instrument]
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::rule_source_with_source(
                format!("failed to read rules from {}", path.display()),
                Box::new(e),
            )
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let rules = match extension.as_deref() {
            Some("json") => Self::from_json_str(&content)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content)?,
            _ => {
                return Err(MonitorError::rule_source(format!(
                    "unsupported rule document {}: expected .json, .yaml or .yml",
                    path.display()
                )))
            }
        };

        debug!(path = %path.display(), rules = rules.len(), "Loaded rules");
        Ok(rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn into_rules(self) -> Vec<Rule> {
        self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self::new(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_json_list_with_defaults() {
        let rules = RuleSet::from_json_str(
            r#"[
                {"rule_id": "R1", "check_type": "completeness", "column": "email", "threshold": 5},
                {"rule_id": "R2", "check_type": "freshness", "column": "updated_at"}
            ]"#,
        )
        .unwrap();

        assert_eq!(rules.len(), 2);
        let first = &rules.rules()[0];
        assert_eq!(first.check_type, RuleKind::Known(CheckType::Completeness));
        assert_eq!(first.severity, Severity::Medium);
        assert!(!first.alert);
        assert_eq!(first.threshold, Some(5.0));

        let second = &rules.rules()[1];
        assert_eq!(second.check_type, RuleKind::Unknown("freshness".to_string()));
        assert_eq!(second.known_check_type(), None);
    }

    #[test]
    fn test_parse_yaml_wrapped_document() {
        let rules = RuleSet::from_yaml_str(
            r#"
rules:
  - rule_id: R1
    rule_name: Order references
    check_type: referential_integrity
    column: customer_id
    severity: high
    alert: true
    ref_database: crm
    ref_table: customers
    ref_column: id
"#,
        )
        .unwrap();

        let rule = &rules.rules()[0];
        assert_eq!(rule.severity, Severity::High);
        assert!(rule.alert);
        assert_eq!(rule.rule_name.as_deref(), Some("Order references"));
    }

    #[test]
    fn test_unshaped_document_is_rule_source_error() {
        for input in ["{\"rules\": 3}", "{\"checks\": []}", "\"rules\"", "[{"] {
            let err = RuleSet::from_json_str(input).unwrap_err();
            assert!(matches!(err, MonitorError::RuleSource { .. }), "{input}: {err}");
        }
        let err = RuleSet::from_yaml_str("rules: 3").unwrap_err();
        assert!(matches!(err, MonitorError::RuleSource { .. }));
    }

    #[test]
    fn test_malformed_entry_is_isolated() {
        let rules = RuleSet::from_json_str(
            r#"[
                {"rule_id": "A", "check_type": "completeness", "column": "email", "threshold": "five", "alert": true},
                {"rule_id": "B", "check_type": "uniqueness", "column": "id"}
            ]"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 2);

        let bad = &rules.rules()[0];
        assert_eq!(bad.rule_id, "A");
        assert_eq!(bad.column, "email");
        assert_eq!(bad.known_check_type(), Some(CheckType::Completeness));
        assert!(bad.alert);
        assert!(bad.rejection().unwrap().contains("five"));
        match bad.resolve().unwrap_err() {
            MonitorError::InvalidRule { rule_id, message } => {
                assert_eq!(rule_id, "A");
                assert!(message.starts_with("malformed rule"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }

        let good = &rules.rules()[1];
        assert_eq!(good.rejection(), None);
        assert!(good.resolve().is_ok());
    }

    #[test]
    fn test_malformed_yaml_entries_keep_what_can_be_read() {
        let rules = RuleSet::from_yaml_str(
            r#"
rules:
  - rule_id: R1
    check_type: uniqueness
    column: id
    severity: urgent
  - check_type: value_range
    min_value: low
  - rule_id: 7
    check_type: completeness
    column: email
"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 3);

        let unknown_severity = &rules.rules()[0];
        assert_eq!(unknown_severity.severity, Severity::Medium);
        assert!(unknown_severity.resolve().is_err());

        let anonymous = &rules.rules()[1];
        assert_eq!(anonymous.rule_id, "rule[1]");
        assert_eq!(anonymous.column, "");
        assert_eq!(anonymous.known_check_type(), Some(CheckType::ValueRange));
        assert!(anonymous.resolve().is_err());

        let numeric_id = &rules.rules()[2];
        assert_eq!(numeric_id.rule_id, "7");
        assert!(numeric_id.rejection().is_some());
    }

    #[test]
    fn test_from_path_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("rules.json");
        std::fs::write(
            &json_path,
            r#"{"rules": [{"rule_id": "R1", "check_type": "uniqueness", "column": "id"}]}"#,
        )
        .unwrap();
        assert_eq!(RuleSet::from_path(&json_path).unwrap().len(), 1);

        let yaml_path = dir.path().join("rules.yml");
        let mut file = std::fs::File::create(&yaml_path).unwrap();
        writeln!(file, "- rule_id: R1\n  check_type: pattern\n  column: sku\n  pattern: '^A'").unwrap();
        assert_eq!(RuleSet::from_path(&yaml_path).unwrap().len(), 1);

        let txt_path = dir.path().join("rules.txt");
        std::fs::write(&txt_path, "[]").unwrap();
        assert!(RuleSet::from_path(&txt_path).is_err());

        assert!(RuleSet::from_path(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let completeness = Rule::new("R1", CheckType::Completeness, "email");
        assert_eq!(
            completeness.resolve().unwrap(),
            CheckSpec::Completeness {
                column: "email".to_string(),
                threshold: 0.0
            }
        );

        let uniqueness = Rule::new("R2", CheckType::Uniqueness, "id");
        assert_eq!(
            uniqueness.resolve().unwrap(),
            CheckSpec::Uniqueness {
                column: "id".to_string(),
                threshold: 100.0
            }
        );
    }

    #[test]
    fn test_resolve_rejects_bad_parameters() {
        let no_pattern = Rule::new("R1", CheckType::Pattern, "sku");
        assert!(matches!(
            no_pattern.resolve().unwrap_err(),
            MonitorError::InvalidRule { .. }
        ));

        let bad_regex = Rule::new("R2", CheckType::Pattern, "sku").with_pattern("(");
        assert!(bad_regex.resolve().is_err());

        let inverted = Rule::new("R3", CheckType::ValueRange, "age").with_range(Some(10.0), Some(1.0));
        assert!(inverted.resolve().is_err());

        let partial_ref = Rule {
            ref_database: Some("crm".to_string()),
            ..Rule::new("R4", CheckType::ReferentialIntegrity, "customer_id")
        };
        assert!(partial_ref.resolve().is_err());

        let unknown = Rule::new("R5", RuleKind::Unknown("freshness".to_string()), "ts");
        assert!(unknown.resolve().is_err());
    }

    #[test]
    fn test_resolve_reference() {
        let rule = Rule::new("R1", CheckType::ReferentialIntegrity, "customer_id")
            .with_reference("crm", "customers", "id");
        assert_eq!(
            rule.resolve().unwrap(),
            CheckSpec::ReferentialIntegrity {
                column: "customer_id".to_string(),
                ref_database: "crm".to_string(),
                ref_table: "customers".to_string(),
                ref_column: "id".to_string(),
            }
        );
    }
}
