//! Key naming a persisted result batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one evaluation run of one table.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use dq_monitor::repository::ResultKey;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
/// let key = ResultKey::new("sales", "orders", at);
/// assert_eq!(key.file_name(), "sales_orders_20240301_083000.json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultKey {
    pub database: String,
    pub table: String,
    pub timestamp: DateTime<Utc>,
}

impl ResultKey {
    pub fn new(database: impl Into<String>, table: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            timestamp,
        }
    }

    /// A key stamped with the current time.
    pub fn now(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self::new(database, table, Utc::now())
    }

    /// `{database}_{table}_{YYYYmmdd_HHMMSS}.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.json",
            self.database,
            self.table,
            self.timestamp.format("%Y%m%d_%H%M%S")
        )
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}@{}",
            self.database,
            self.table,
            self.timestamp.to_rfc3339()
        )
    }
}
