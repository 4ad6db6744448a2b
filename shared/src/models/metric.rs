//! Metric sample model.
//!
//! Monitors report their results as `MetricSample`s; the metric registry turns
//! the numeric ones into exported gauges.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The value produced for a metric by a monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// A plain numeric value.
    Number(f64),
    /// A boolean status, exported as `1.0` or `0.0`.
    Flag(bool),
    /// A textual status; never exported as a gauge.
    Text(String),
}

impl MetricValue {
    /// Returns the gauge value, or `None` for textual values.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::models::MetricValue;
    ///
    /// assert_eq!(MetricValue::Number(0.25).as_gauge(), Some(0.25));
    /// assert_eq!(MetricValue::Flag(true).as_gauge(), Some(1.0));
    /// assert_eq!(MetricValue::Text("ok".to_string()).as_gauge(), None);
    /// ```
    #[must_use]
    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(_) => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A named metric value with its labels.
///
/// # Example
///
/// ```
/// use shared::models::{MetricSample, MetricValue};
///
/// let sample = MetricSample::new("data_drift:p_value", 0.03)
///     .with_label("feature", "bedrooms")
///     .with_label("feature_type", "num");
///
/// assert_eq!(sample.value, MetricValue::Number(0.03));
/// assert_eq!(sample.labels.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Metric name without the service prefix (e.g. `data_drift:p_value`).
    pub name: String,

    /// The reported value.
    pub value: MetricValue,

    /// Label set of this sample.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Help text shown in the exposition output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MetricSample {
    /// Creates a sample without labels.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            labels: BTreeMap::new(),
            description: None,
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
