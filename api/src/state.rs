//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use shared::config::MonitoringConfig;
use shared::monitoring::{MonitoringError, MonitoringService};
use std::sync::Arc;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The monitoring service owning every dataset window.
    service: Arc<MonitoringService>,
}

impl AppState {
    /// Creates a new application state around a monitoring service.
    #[must_use]
    pub fn new(service: MonitoringService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Loads reference data and builds the state from a monitoring configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured dataset cannot be loaded.
    pub fn from_config(config: &MonitoringConfig) -> Result<Self, MonitoringError> {
        Ok(Self::new(MonitoringService::from_config(config)?))
    }

    /// Returns a reference to the monitoring service.
    #[must_use]
    pub fn service(&self) -> &MonitoringService {
        &self.service
    }

    /// Returns a shared handle to the monitoring service.
    #[must_use]
    pub fn service_handle(&self) -> Arc<MonitoringService> {
        Arc::clone(&self.service)
    }
}

#[cfg(test)]
impl AppState {
    /// State with one `houses` dataset monitoring `bedrooms` and `condition`.
    pub(crate) fn for_tests(window_size: usize, period_secs: f64) -> Self {
        use shared::config::{ColumnMapping, DataDriftOptions, MonitorKind, ServiceOptions};
        use shared::dataset::ReferenceSample;
        use shared::drift::build_monitor;
        use shared::models::FeatureRow;
        use shared::monitoring::DatasetDefinition;

        let column_mapping = ColumnMapping {
            numerical_features: vec!["bedrooms".to_string()],
            categorical_features: vec!["condition".to_string()],
            ..ColumnMapping::default()
        };
        let rows: Vec<FeatureRow> = (0..40_i32)
            .map(|i| {
                FeatureRow::new()
                    .with_value("bedrooms", f64::from(i % 4 + 1))
                    .with_value("condition", f64::from(i % 3 + 3))
            })
            .collect();
        let reference = ReferenceSample::from_rows(&rows, &column_mapping.monitored_features());

        let service = MonitoringService::new(
            &ServiceOptions::new("datasets", window_size, period_secs),
            vec![DatasetDefinition {
                name: "houses".to_string(),
                reference,
                column_mapping,
                monitors: vec![build_monitor(MonitorKind::DataDrift, &DataDriftOptions::default())],
            }],
        );
        Self::new(service)
    }
}
