//! The outcome of processing one asset.
//!
//! A [`ProcessingResult`] is either a success carrying an output path or a
//! failure carrying an error message, never both and never neither. The only
//! way to build one is [`ProcessingResult::success`] or
//! [`ProcessingResult::failure`], so the invariant holds by construction.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A single metric value. Serialized untagged, so JSON output reads
/// `{"input_size": 1024, "size_ratio": 0.5, "format": "webp"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{v}"),
            MetricValue::Float(v) => write!(f, "{v}"),
            MetricValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}

impl From<u32> for MetricValue {
    fn from(v: u32) -> Self {
        MetricValue::Int(v.into())
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        MetricValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

/// Ordered metric mapping. Empty is allowed; absent is not.
pub type Metrics = BTreeMap<String, MetricValue>;

#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Output(PathBuf),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    outcome: Outcome,
    metrics: Metrics,
    duration_ms: u64,
}

impl ProcessingResult {
    pub fn success(output_path: impl Into<PathBuf>, metrics: Metrics) -> Self {
        Self {
            outcome: Outcome::Output(output_path.into()),
            metrics,
            duration_ms: 1,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Error(error.into()),
            metrics: Metrics::new(),
            duration_ms: 1,
        }
    }

    /// Record the wall-clock duration. Never reports zero.
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms.max(1);
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Output(_))
    }

    pub fn output_path(&self) -> Option<&Path> {
        match &self.outcome {
            Outcome::Output(p) => Some(p),
            Outcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Output(_) => None,
            Outcome::Error(e) => Some(e),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

impl Serialize for ProcessingResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Flat<'a> {
            success: bool,
            output_path: Option<&'a Path>,
            error: Option<&'a str>,
            metrics: &'a Metrics,
            duration_ms: u64,
        }

        Flat {
            success: self.is_success(),
            output_path: self.output_path(),
            error: self.error(),
            metrics: &self.metrics,
            duration_ms: self.duration_ms,
        }
        .serialize(serializer)
    }
}
