//! Windowed monitoring.
//!
//! This module holds the per-dataset rolling window, the evaluation throttle, the
//! Prometheus metric registry and the service tying them together.

pub mod registry;
pub mod service;
pub mod throttle;
pub mod window;

pub use registry::{MetricRegistry, RecordOutcome, RegistryError, DATASET_LABEL};
pub use service::{
    DatasetDefinition, EvaluationSummary, IterationOutcome, MonitoringError, MonitoringService,
    REFERENCE_FILE,
};
pub use throttle::{Throttle, TriggerDecision};
pub use window::{RollingWindow, WindowState};
