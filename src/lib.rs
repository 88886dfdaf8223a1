pub mod api;
pub mod audit;
pub mod client;
pub mod collector;
pub mod config;
pub mod retry;
pub mod storage;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::storage::error::StorageError;

/// Kind of a stored metric.
///
/// Counters accumulate integer deltas; gauges hold the last written
/// floating-point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
        }
    }
}

impl FromStr for MetricKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(MetricKind::Counter),
            "gauge" => Ok(MetricKind::Gauge),
            other => Err(StorageError::UnknownKind(other.to_string())),
        }
    }
}

/// A single metric point, identified by (kind, id).
///
/// Exactly one of `delta`/`value` is meaningful, matching the kind. The same
/// shape is used on the wire, in the snapshot file and in the database:
/// `{"id": "...", "type": "counter"|"gauge", "delta"?: int, "value"?: float}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: MetricKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl MetricPoint {
    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Counter,
            delta: Some(delta),
            value: None,
        }
    }

    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Gauge,
            delta: None,
            value: Some(value),
        }
    }

    /// The stored value for this point, or `None` when the kind's field is
    /// absent (a malformed import).
    pub fn metric_value(&self) -> Option<MetricValue> {
        match self.kind {
            MetricKind::Counter => self.delta.map(MetricValue::Counter),
            MetricKind::Gauge => self.value.map(MetricValue::Gauge),
        }
    }

    /// Check that the id is non-empty and the kind's required field is
    /// present.
    ///
    /// Used by batch ingestion before a point touches a backend.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.id.is_empty() {
            return Err(StorageError::Validation(
                "metric id must not be empty".to_string(),
            ));
        }
        match self.kind {
            MetricKind::Counter if self.delta.is_none() => Err(StorageError::Validation(format!(
                "counter '{}' is missing delta",
                self.id
            ))),
            MetricKind::Gauge if self.value.is_none() => Err(StorageError::Validation(format!(
                "gauge '{}' is missing value",
                self.id
            ))),
            _ => Ok(()),
        }
    }
}

/// Value read back from a repository, copied out of backend state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Counter(i64),
    Gauge(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Counter(delta) => write!(f, "{delta}"),
            MetricValue::Gauge(value) => write!(f, "{value}"),
        }
    }
}
