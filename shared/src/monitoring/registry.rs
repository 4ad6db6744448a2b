//! Metric registry.
//!
//! Maps metric names to Prometheus gauge families created lazily on first use.
//! The label keys of a family are fixed by the first sample recorded under its
//! name; later samples with different keys are rejected.

use crate::models::MetricSample;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use thiserror::Error;

/// Label injected into every recorded sample.
pub const DATASET_LABEL: &str = "dataset_name";

/// Errors that can occur while recording or exporting metrics.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to acquire lock on the registry.
    #[error("Failed to acquire lock on metric registry")]
    LockError,

    /// A sample's label keys differ from the ones the gauge was created with.
    #[error("Label mismatch for metric {metric}: expected {expected:?}, got {actual:?}")]
    LabelMismatch {
        /// Full metric name.
        metric: String,
        /// Label keys fixed at creation.
        expected: Vec<String>,
        /// Label keys of the rejected sample.
        actual: Vec<String>,
    },

    /// The Prometheus client rejected a name, label or registration.
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// The exposition output was not valid UTF-8.
    #[error("Invalid exposition output: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// What happened to a recorded sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The gauge was set.
    Set,
    /// The value was textual and was not exported.
    SkippedText,
}

struct GaugeFamily {
    gauges: GaugeVec,
    label_keys: Vec<String>,
}

/// Registry of exported gauges, owned by one monitoring service.
pub struct MetricRegistry {
    prefix: String,
    registry: Registry,
    families: Mutex<HashMap<String, GaugeFamily>>,
}

impl MetricRegistry {
    /// Creates an empty registry whose metric names start with `prefix:`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            registry: Registry::new(),
            families: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the exported name of a metric.
    #[must_use]
    pub fn full_name(&self, metric_name: &str) -> String {
        format!("{}:{metric_name}", self.prefix)
    }

    /// Records a sample for a dataset, injecting the `dataset_name` label.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample's label keys differ from the ones its gauge
    /// was created with, or if Prometheus rejects the metric.
    pub fn record(
        &self,
        dataset_name: &str,
        sample: &MetricSample,
    ) -> Result<RecordOutcome, RegistryError> {
        let Some(value) = sample.value.as_gauge() else {
            return Ok(RecordOutcome::SkippedText);
        };

        let mut labels = sample.labels.clone();
        labels.insert(DATASET_LABEL.to_string(), dataset_name.to_string());
        let label_keys: Vec<String> = labels.keys().cloned().collect();

        let name = self.full_name(&sample.name);
        let mut families = self.families.lock().map_err(|_| RegistryError::LockError)?;

        if !families.contains_key(&name) {
            let help = sample.description.clone().unwrap_or_else(|| name.clone());
            let keys: Vec<&str> = label_keys.iter().map(String::as_str).collect();
            let gauges = GaugeVec::new(Opts::new(name.clone(), help), &keys)?;
            self.registry.register(Box::new(gauges.clone()))?;
            tracing::debug!(metric = %name, labels = ?label_keys, "Created gauge");
            families.insert(
                name.clone(),
                GaugeFamily {
                    gauges,
                    label_keys: label_keys.clone(),
                },
            );
        }

        let family = &families[&name];
        if family.label_keys != label_keys {
            return Err(RegistryError::LabelMismatch {
                metric: name,
                expected: family.label_keys.clone(),
                actual: label_keys,
            });
        }

        let label_values: HashMap<&str, &str> = labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        family.gauges.get_metric_with(&label_values)?.set(value);

        Ok(RecordOutcome::Set)
    }

    /// Returns the current value of a gauge without creating it.
    ///
    /// `labels` excludes the injected `dataset_name` label.
    #[must_use]
    pub fn value(
        &self,
        dataset_name: &str,
        metric_name: &str,
        labels: &BTreeMap<String, String>,
    ) -> Option<f64> {
        let name = self.full_name(metric_name);
        let mut wanted = labels.clone();
        wanted.insert(DATASET_LABEL.to_string(), dataset_name.to_string());

        let families = self.registry.gather();
        let value = families
            .iter()
            .filter(|family| family.get_name() == name)
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                let pairs = metric.get_label();
                pairs.len() == wanted.len()
                    && pairs
                        .iter()
                        .all(|p| wanted.get(p.get_name()).map(String::as_str) == Some(p.get_value()))
            })
            .map(|metric| metric.get_gauge().get_value());
        value
    }

    /// Names of every gauge family created so far.
    #[must_use]
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .families
            .lock()
            .map(|families| families.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Renders every gauge in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn gather(&self) -> Result<String, RegistryError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Content type of the exposition output.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("prefix", &self.prefix)
            .field("metrics", &self.metric_names())
            .finish_non_exhaustive()
    }
}
