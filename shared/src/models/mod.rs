//! Data models for the Driftwatch monitoring service.
//!
//! This module contains the feature rows fed into the monitoring window and the
//! metric samples produced by monitors.

pub mod metric;
pub mod row;

pub use metric::{MetricSample, MetricValue};
pub use row::{FeatureRow, RowExtraction};
