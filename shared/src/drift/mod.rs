//! Drift monitors.
//!
//! A `Monitor` compares the current window of a dataset against its reference
//! sample and reports the outcome as metric samples. Monitors are built from the
//! `monitors` list of each dataset configuration.

pub mod data_drift;
pub mod stattest;

pub use data_drift::{DataDriftMonitor, DataDriftReport, FeatureDrift, FeatureType};
pub use stattest::TestResult;

use crate::config::{ColumnMapping, DataDriftOptions, MonitorKind};
use crate::dataset::ReferenceSample;
use crate::models::{FeatureRow, MetricSample};
use thiserror::Error;

/// Errors that can occur while evaluating a monitor.
#[derive(Debug, Error)]
pub enum DriftError {
    /// A sample did not hold enough values for the test.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A monitored feature has no column in the reference sample.
    #[error("Feature '{0}' is missing from the reference sample")]
    MissingReferenceColumn(String),

    /// The statistics backend rejected its input.
    #[error("Statistics error: {0}")]
    Statistics(String),
}

/// Everything a monitor needs for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    /// The fixed baseline.
    pub reference: &'a ReferenceSample,
    /// Snapshot of the current window, oldest row first.
    pub current: &'a [FeatureRow],
    /// Column roles of the dataset.
    pub column_mapping: &'a ColumnMapping,
}

/// Trait for monitors run on every evaluation of a dataset.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait Monitor: Send + Sync {
    /// Returns the kind of this monitor.
    fn kind(&self) -> MonitorKind;

    /// Compares the current window against the reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the comparison cannot be computed.
    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<Vec<MetricSample>, DriftError>;
}

/// Builds the monitor for a configured kind.
#[must_use]
pub fn build_monitor(kind: MonitorKind, data_drift: &DataDriftOptions) -> Box<dyn Monitor> {
    match kind {
        MonitorKind::DataDrift => Box::new(DataDriftMonitor::new(data_drift.clone())),
    }
}
