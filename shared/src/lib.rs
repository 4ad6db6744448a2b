//! Driftwatch Shared Library
//!
//! This crate contains the configuration, data models and drift monitoring
//! engine used by the Driftwatch server and CLI.
//!
//! # Modules
//!
//! - [`config`] - Monitoring configuration loaded from YAML
//! - [`dataset`] - CSV reading and reference samples
//! - [`drift`] - Statistical drift tests and monitors
//! - [`models`] - Feature rows and metric samples
//! - [`monitoring`] - Rolling windows, throttling and the metric registry
//!
//! # Example
//!
//! ```
//! use shared::models::FeatureRow;
//! use shared::monitoring::RollingWindow;
//!
//! let mut window = RollingWindow::new(2);
//! window.push(FeatureRow::new().with_value("bedrooms", 3.0));
//! window.push(FeatureRow::new().with_value("bedrooms", 2.0));
//!
//! assert!(window.is_full());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod dataset;
pub mod drift;
pub mod models;
pub mod monitoring;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
