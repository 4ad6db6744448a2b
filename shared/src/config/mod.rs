//! Configuration module for Driftwatch.
//!
//! This module contains the typed model of the monitoring configuration file.

pub mod monitoring;

pub use monitoring::{
    ColumnMapping, ConfigError, DataDriftOptions, DataFormat, DatasetConfig, MonitorKind,
    MonitoringConfig, ServiceOptions,
};
