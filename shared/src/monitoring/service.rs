//! Monitoring service.
//!
//! Owns every registered dataset together with its rolling window, throttle and
//! monitors, and records evaluation results in the metric registry. The service
//! is an ordinary value: construct it once and share it behind an `Arc`.

use super::registry::{MetricRegistry, RecordOutcome, RegistryError};
use super::throttle::{Throttle, TriggerDecision};
use super::window::{RollingWindow, WindowState};
use crate::config::{ColumnMapping, MonitoringConfig, ServiceOptions};
use crate::dataset::{DatasetError, ReferenceSample};
use crate::drift::{build_monitor, EvaluationInput, Monitor};
use crate::models::{FeatureRow, MetricSample};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

/// Name of the reference file inside each dataset directory.
pub const REFERENCE_FILE: &str = "reference.csv";

/// Errors that can occur in the monitoring service.
#[derive(Debug, Error)]
pub enum MonitoringError {
    /// The dataset is not registered.
    #[error("Dataset '{0}' is not registered")]
    UnknownDataset(String),

    /// Failed to acquire the lock on a dataset's state.
    #[error("Failed to acquire lock on dataset '{0}'")]
    LockError(String),

    /// A configured dataset has no reference file.
    #[error("Reference file for dataset '{dataset}' not found at {path}")]
    MissingReference {
        /// Dataset name.
        dataset: String,
        /// Expected reference path.
        path: String,
    },

    /// The datasets directory could not be listed.
    #[error("Failed to list datasets directory {path}: {source}")]
    DatasetsDir {
        /// Directory path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A reference sample could not be loaded.
    #[error("Failed to load reference for dataset '{dataset}': {source}")]
    Reference {
        /// Dataset name.
        dataset: String,
        /// Underlying dataset error.
        #[source]
        source: DatasetError,
    },
}

/// A dataset ready to be registered with the service.
pub struct DatasetDefinition {
    /// Dataset name, used in the ingestion path and as a metric label.
    pub name: String,
    /// The fixed baseline.
    pub reference: ReferenceSample,
    /// Column roles, including the monitored feature subset.
    pub column_mapping: ColumnMapping,
    /// Monitors run on every evaluation.
    pub monitors: Vec<Box<dyn Monitor>>,
}

struct DatasetState {
    window: RollingWindow,
    throttle: Throttle,
}

struct RegisteredDataset {
    reference: ReferenceSample,
    column_mapping: ColumnMapping,
    features: Vec<String>,
    monitors: Vec<Box<dyn Monitor>>,
    /// Created on the first row received.
    state: Mutex<Option<DatasetState>>,
}

impl RegisteredDataset {
    fn lock(&self, name: &str) -> Result<MutexGuard<'_, Option<DatasetState>>, MonitoringError> {
        self.state
            .lock()
            .map_err(|_| MonitoringError::LockError(name.to_string()))
    }
}

/// Result of feeding a batch of rows to a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationOutcome {
    /// Rows appended to the window.
    pub accepted: usize,
    /// Rows dropped because they held none of the monitored features.
    pub dropped: usize,
    /// Window length after the batch.
    pub window_len: usize,
    /// Configured window size.
    pub window_size: usize,
    /// Trigger decision taken after the batch.
    pub decision: TriggerDecision,
    /// Evaluation details if one ran.
    pub evaluation: Option<EvaluationSummary>,
}

impl IterationOutcome {
    /// Returns true if an evaluation ran.
    #[must_use]
    pub fn evaluated(&self) -> bool {
        self.evaluation.is_some()
    }
}

/// What an evaluation produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationSummary {
    /// Gauges set.
    pub recorded: usize,
    /// Samples skipped (textual values or registry errors).
    pub skipped: usize,
    /// Monitors that failed.
    pub failed_monitors: usize,
}

/// Windowed drift monitoring over a fixed set of datasets.
pub struct MonitoringService {
    datasets: BTreeMap<String, RegisteredDataset>,
    window_size: usize,
    calculation_period: Duration,
    registry: MetricRegistry,
}

impl MonitoringService {
    /// Creates a service from already loaded datasets.
    #[must_use]
    pub fn new(options: &ServiceOptions, datasets: Vec<DatasetDefinition>) -> Self {
        let datasets = datasets
            .into_iter()
            .map(|d| {
                let features = d.column_mapping.monitored_features();
                (
                    d.name,
                    RegisteredDataset {
                        reference: d.reference,
                        column_mapping: d.column_mapping,
                        features,
                        monitors: d.monitors,
                        state: Mutex::new(None),
                    },
                )
            })
            .collect();

        Self {
            datasets,
            window_size: options.window_size,
            calculation_period: options.calculation_period(),
            registry: MetricRegistry::new(options.metric_prefix.clone()),
        }
    }

    /// Loads every configured dataset's reference sample and builds the service.
    ///
    /// Directories under `datasets_path` that are not configured are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the datasets directory cannot be listed or a configured
    /// dataset's reference cannot be loaded.
    pub fn from_config(config: &MonitoringConfig) -> Result<Self, MonitoringError> {
        let root = Path::new(&config.service.datasets_path);
        let entries = std::fs::read_dir(root).map_err(|source| MonitoringError::DatasetsDir {
            path: root.display().to_string(),
            source,
        })?;

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_dir() && !config.datasets.contains_key(&name) {
                tracing::error!(dataset = %name, "Dataset is not configured, skipping");
            }
        }

        let mut definitions = Vec::with_capacity(config.datasets.len());
        for (name, dataset) in &config.datasets {
            let path = root.join(name).join(REFERENCE_FILE);
            if !path.is_file() {
                return Err(MonitoringError::MissingReference {
                    dataset: name.clone(),
                    path: path.display().to_string(),
                });
            }

            tracing::info!(dataset = %name, path = %path.display(), "Loading reference data");
            let features = dataset.column_mapping.monitored_features();
            let reference = ReferenceSample::load(&path, &dataset.data_format, &features)
                .map_err(|source| MonitoringError::Reference {
                    dataset: name.clone(),
                    source,
                })?;
            tracing::info!(
                dataset = %name,
                rows = reference.row_count(),
                features = reference.feature_count(),
                "Reference data loaded"
            );

            definitions.push(DatasetDefinition {
                name: name.clone(),
                reference,
                column_mapping: dataset.column_mapping.clone(),
                monitors: dataset
                    .monitors
                    .iter()
                    .map(|kind| build_monitor(*kind, &config.service.data_drift))
                    .collect(),
            });
        }

        Ok(Self::new(&config.service, definitions))
    }

    /// Names of the registered datasets.
    #[must_use]
    pub fn dataset_names(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }

    /// Returns true if `dataset_name` is registered.
    #[must_use]
    pub fn is_registered(&self, dataset_name: &str) -> bool {
        self.datasets.contains_key(dataset_name)
    }

    /// Configured window size.
    #[must_use]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// The registry holding every exported gauge.
    #[must_use]
    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Renders all metrics in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn gather_metrics(&self) -> Result<String, RegistryError> {
        self.registry.gather()
    }

    fn dataset(&self, dataset_name: &str) -> Result<&RegisteredDataset, MonitoringError> {
        self.datasets
            .get(dataset_name)
            .ok_or_else(|| MonitoringError::UnknownDataset(dataset_name.to_string()))
    }

    fn new_state(&self) -> DatasetState {
        DatasetState {
            window: RollingWindow::new(self.window_size),
            throttle: Throttle::new(self.calculation_period),
        }
    }

    /// Appends a row to a dataset's window.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset is not registered.
    pub fn append(
        &self,
        dataset_name: &str,
        row: FeatureRow,
    ) -> Result<WindowState, MonitoringError> {
        let dataset = self.dataset(dataset_name)?;
        let mut guard = dataset.lock(dataset_name)?;
        let state = guard.get_or_insert_with(|| self.new_state());
        state.window.push(row);
        Ok(state.window.state())
    }

    /// Returns true if the dataset's window is full and its cooldown has elapsed.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset is not registered.
    pub fn should_evaluate(
        &self,
        dataset_name: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, MonitoringError> {
        let dataset = self.dataset(dataset_name)?;
        let guard = dataset.lock(dataset_name)?;
        let ready = guard.as_ref().is_some_and(|state| {
            state
                .throttle
                .decide(state.window.len(), self.window_size, now)
                .is_ready()
        });
        Ok(ready)
    }

    /// Starts a new cooldown for the dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset is not registered.
    pub fn mark_evaluated(
        &self,
        dataset_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), MonitoringError> {
        let dataset = self.dataset(dataset_name)?;
        let mut guard = dataset.lock(dataset_name)?;
        guard
            .get_or_insert_with(|| self.new_state())
            .throttle
            .mark_evaluated(now);
        Ok(())
    }

    /// Feeds raw JSON rows to a dataset using the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset is not registered.
    pub fn iterate(
        &self,
        dataset_name: &str,
        rows: &[Map<String, Value>],
    ) -> Result<IterationOutcome, MonitoringError> {
        self.iterate_at(dataset_name, rows, Utc::now())
    }

    /// Feeds raw JSON rows to a dataset and evaluates it if the trigger allows.
    ///
    /// Rows are projected onto the monitored features; rows holding none of them
    /// are dropped. Monitor failures are logged and never returned: the cooldown
    /// has already started when the monitors run.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset is not registered or its lock is poisoned.
    pub fn iterate_at(
        &self,
        dataset_name: &str,
        rows: &[Map<String, Value>],
        now: DateTime<Utc>,
    ) -> Result<IterationOutcome, MonitoringError> {
        let dataset = self.dataset(dataset_name)?;

        let mut accepted = Vec::with_capacity(rows.len());
        for raw in rows {
            let extraction = FeatureRow::from_json(raw, &dataset.features);
            if extraction.row.is_empty() {
                tracing::warn!(
                    dataset = dataset_name,
                    "Row holds none of the monitored features, dropping it"
                );
                continue;
            }
            if !extraction.is_complete() {
                tracing::debug!(
                    dataset = dataset_name,
                    missing = ?extraction.missing,
                    "Row is missing monitored features"
                );
            }
            accepted.push(extraction.row);
        }
        let dropped = rows.len() - accepted.len();
        let accepted_count = accepted.len();

        let (window_len, decision, snapshot) = {
            let mut guard = dataset.lock(dataset_name)?;
            if accepted.is_empty() && guard.is_none() {
                // No row received yet, so no window or throttle exists.
                return Ok(IterationOutcome {
                    accepted: 0,
                    dropped,
                    window_len: 0,
                    window_size: self.window_size,
                    decision: TriggerDecision::InsufficientData {
                        len: 0,
                        required: self.window_size,
                    },
                    evaluation: None,
                });
            }
            let state = guard.get_or_insert_with(|| self.new_state());
            for row in accepted {
                state.window.push(row);
            }

            let window_len = state.window.len();
            let decision = state.throttle.decide(window_len, self.window_size, now);
            let snapshot = if decision.is_ready() {
                state.throttle.mark_evaluated(now);
                Some(state.window.snapshot())
            } else {
                None
            };
            (window_len, decision, snapshot)
        };

        match decision {
            TriggerDecision::InsufficientData { len, required } => {
                tracing::info!(
                    dataset = dataset_name,
                    window_len = len,
                    window_size = required,
                    "Window has less data than the window size, waiting for more data"
                );
            }
            TriggerDecision::CoolingDown { next_allowed } => {
                tracing::info!(
                    dataset = dataset_name,
                    next_run = %next_allowed,
                    "Evaluation is cooling down"
                );
            }
            TriggerDecision::Ready => {}
        }

        let evaluation = snapshot.map(|rows| self.evaluate(dataset_name, dataset, &rows));

        Ok(IterationOutcome {
            accepted: accepted_count,
            dropped,
            window_len,
            window_size: self.window_size,
            decision,
            evaluation,
        })
    }

    fn evaluate(
        &self,
        dataset_name: &str,
        dataset: &RegisteredDataset,
        rows: &[FeatureRow],
    ) -> EvaluationSummary {
        let input = EvaluationInput {
            reference: &dataset.reference,
            current: rows,
            column_mapping: &dataset.column_mapping,
        };

        let mut summary = EvaluationSummary::default();
        let mut samples = Vec::new();
        for monitor in &dataset.monitors {
            match monitor.evaluate(&input) {
                Ok(produced) => samples.extend(produced),
                Err(e) => {
                    summary.failed_monitors += 1;
                    tracing::error!(
                        dataset = dataset_name,
                        monitor = %monitor.kind(),
                        error = %e,
                        "Monitor evaluation failed"
                    );
                }
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let n_features = dataset.features.len() as f64;
        samples.push(
            MetricSample::new("reference_dataset_hash", 1.0)
                .with_label("hash", dataset.reference.hash())
                .with_description("Hash of the reference sample in use"),
        );
        samples.push(
            MetricSample::new("n_features", n_features)
                .with_description("Number of monitored features"),
        );

        for sample in &samples {
            match self.registry.record(dataset_name, sample) {
                Ok(RecordOutcome::Set) => summary.recorded += 1,
                Ok(RecordOutcome::SkippedText) => summary.skipped += 1,
                Err(e) => {
                    summary.skipped += 1;
                    tracing::error!(
                        dataset = dataset_name,
                        metric = %sample.name,
                        error = %e,
                        "Failed to record metric"
                    );
                }
            }
        }

        tracing::info!(
            dataset = dataset_name,
            window_len = rows.len(),
            recorded = summary.recorded,
            failed_monitors = summary.failed_monitors,
            "Evaluation finished"
        );
        summary
    }
}

impl std::fmt::Debug for MonitoringService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringService")
            .field("datasets", &self.dataset_names())
            .field("window_size", &self.window_size)
            .field("calculation_period", &self.calculation_period)
            .finish_non_exhaustive()
    }
}
