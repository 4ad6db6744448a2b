//! Feature row model.
//!
//! A `FeatureRow` is the numeric projection of one inference request onto the
//! monitored feature subset of a dataset.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One inference request's monitored inputs, keyed by feature name.
///
/// # Example
///
/// ```
/// use shared::models::FeatureRow;
///
/// let row = FeatureRow::new()
///     .with_value("bedrooms", 3.0)
///     .with_value("condition", 4.0);
///
/// assert_eq!(row.get("bedrooms"), Some(3.0));
/// assert_eq!(row.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRow {
    values: BTreeMap<String, f64>,
}

impl FeatureRow {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a feature value.
    #[must_use]
    pub fn with_value(mut self, feature: impl Into<String>, value: f64) -> Self {
        self.values.insert(feature.into(), value);
        self
    }

    /// Returns the value of a feature if present.
    #[must_use]
    pub fn get(&self, feature: &str) -> Option<f64> {
        self.values.get(feature).copied()
    }

    /// Number of features present in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row holds no feature.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(feature, value)` pairs in feature-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Projects a JSON object onto the given features.
    ///
    /// Fields outside `features` are ignored. Numbers are taken as is and booleans
    /// become `1.0`/`0.0`; absent, null, text or non-finite values are reported as
    /// missing and left out of the row.
    #[must_use]
    pub fn from_json(object: &Map<String, Value>, features: &[String]) -> RowExtraction {
        let mut row = Self::new();
        let mut missing = Vec::new();

        for feature in features {
            match object.get(feature).and_then(numeric_value) {
                Some(value) => {
                    row.values.insert(feature.clone(), value);
                }
                None => missing.push(feature.clone()),
            }
        }

        RowExtraction { row, missing }
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::String(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

impl FromIterator<(String, f64)> for FeatureRow {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Result of projecting a raw JSON object onto the monitored features.
#[derive(Debug, Clone, PartialEq)]
pub struct RowExtraction {
    /// The features that carried a usable numeric value.
    pub row: FeatureRow,
    /// Monitored features that were absent or not numeric.
    pub missing: Vec<String>,
}

impl RowExtraction {
    /// Returns true if every monitored feature was present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}
