//! Monitoring service configuration.
//!
//! The configuration file is YAML with a `service` section holding the global
//! window parameters and a `datasets` section describing every monitored dataset.
//! Unknown keys are rejected and required keys must be present, so a typo in the
//! file fails at startup instead of silently falling back to a default.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Errors that can occur while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML or does not match the schema.
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A section failed field-level validation.
    #[error("Invalid {section} configuration: {errors}")]
    Validation {
        /// The section that failed (e.g. `service` or `datasets.houses`).
        section: String,
        /// Field-level validation errors.
        errors: validator::ValidationErrors,
    },

    /// A semantic rule spanning several fields was violated.
    #[error("Invalid {section} configuration: {message}")]
    Invalid {
        /// The section that failed.
        section: String,
        /// Description of the problem.
        message: String,
    },
}

/// Kind of monitor that can be run against a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    /// Per-feature distribution drift between reference and current window.
    DataDrift,
}

impl MonitorKind {
    /// Returns the configuration name of this monitor.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DataDrift => "data_drift",
        }
    }
}

impl std::fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Options for the data drift monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DataDriftOptions {
    /// Confidence level of the per-feature tests; a feature drifts when its
    /// p-value is below `1 - confidence`.
    #[serde(default = "default_confidence")]
    #[validate(range(
        exclusive_min = 0.0,
        exclusive_max = 1.0,
        message = "confidence must be between 0 and 1"
    ))]
    pub confidence: f64,

    /// Share of drifted features at which the whole dataset counts as drifted.
    #[serde(default = "default_drift_share")]
    #[validate(range(min = 0.0, max = 1.0, message = "drift_share must be between 0 and 1"))]
    pub drift_share: f64,
}

fn default_confidence() -> f64 {
    0.95
}

fn default_drift_share() -> f64 {
    0.5
}

fn default_metric_prefix() -> String {
    "driftwatch".to_string()
}

impl Default for DataDriftOptions {
    fn default() -> Self {
        Self {
            confidence: default_confidence(),
            drift_share: default_drift_share(),
        }
    }
}

/// Global parameters of the monitoring service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ServiceOptions {
    /// Directory holding one sub-directory per dataset with a `reference.csv`.
    #[validate(length(min = 1, message = "datasets_path cannot be empty"))]
    pub datasets_path: String,

    /// Whether current data is compared against the reference sample.
    pub use_reference: bool,

    /// Whether the reference moves with the current window.
    pub moving_reference: bool,

    /// Number of most recent rows compared against the reference.
    #[validate(range(min = 1, message = "window_size must be at least 1"))]
    pub window_size: usize,

    /// Minimum number of seconds between two evaluations of the same dataset.
    #[validate(custom(function = "validate_calculation_period"))]
    pub calculation_period_sec: f64,

    /// Prefix of every exported metric name.
    #[serde(default = "default_metric_prefix")]
    #[validate(custom(function = "validate_metric_prefix"))]
    pub metric_prefix: String,

    /// Options of the data drift monitor.
    #[serde(default)]
    pub data_drift: DataDriftOptions,
}

impl ServiceOptions {
    /// Returns the evaluation period as a `Duration`.
    ///
    /// Periods too large for a `Duration` saturate to `Duration::MAX`.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::config::ServiceOptions;
    ///
    /// let options = ServiceOptions::new("datasets", 10, 2.5);
    /// assert_eq!(options.calculation_period().as_millis(), 2500);
    /// ```
    #[must_use]
    pub fn calculation_period(&self) -> Duration {
        Duration::try_from_secs_f64(self.calculation_period_sec.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Creates options with the given window parameters and defaults elsewhere.
    #[must_use]
    pub fn new(
        datasets_path: impl Into<String>,
        window_size: usize,
        calculation_period_sec: f64,
    ) -> Self {
        Self {
            datasets_path: datasets_path.into(),
            use_reference: true,
            moving_reference: false,
            window_size,
            calculation_period_sec,
            metric_prefix: default_metric_prefix(),
            data_drift: DataDriftOptions::default(),
        }
    }
}

fn validate_calculation_period(seconds: f64) -> Result<(), ValidationError> {
    if seconds >= 0.0 && Duration::try_from_secs_f64(seconds).is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("calculation_period_sec").with_message(
            "calculation_period_sec must be a non-negative, finite number of seconds".into(),
        ))
    }
}

fn validate_metric_prefix(prefix: &str) -> Result<(), ValidationError> {
    let mut chars = prefix.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == ':');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':') {
        Ok(())
    } else {
        Err(ValidationError::new("metric_prefix")
            .with_message("metric_prefix must be a valid Prometheus metric name".into()))
    }
}

/// Maps dataset columns to their role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMapping {
    /// Column holding the ground-truth target.
    #[serde(default)]
    pub target: Option<String>,

    /// Column holding the model prediction.
    #[serde(default)]
    pub prediction: Option<String>,

    /// Column holding the event timestamp.
    #[serde(default)]
    pub datetime: Option<String>,

    /// Column holding a row identifier.
    #[serde(default)]
    pub id: Option<String>,

    /// Monitored numerical features.
    #[serde(default)]
    pub numerical_features: Vec<String>,

    /// Monitored categorical features.
    #[serde(default)]
    pub categorical_features: Vec<String>,
}

impl ColumnMapping {
    /// Returns every monitored feature: numerical ones first, then categorical.
    #[must_use]
    pub fn monitored_features(&self) -> Vec<String> {
        self.numerical_features
            .iter()
            .chain(&self.categorical_features)
            .cloned()
            .collect()
    }

    /// Returns true if `feature` is configured as categorical.
    #[must_use]
    pub fn is_categorical(&self, feature: &str) -> bool {
        self.categorical_features.iter().any(|f| f == feature)
    }

    fn check(&self) -> Result<(), String> {
        let features = self.monitored_features();
        if features.is_empty() {
            return Err("column_mapping must list at least one numerical or categorical feature".to_string());
        }

        let mut seen = BTreeSet::new();
        for feature in &features {
            if feature.is_empty() {
                return Err("feature names cannot be empty".to_string());
            }
            if !seen.insert(feature.as_str()) {
                return Err(format!("feature '{feature}' is listed more than once"));
            }
        }

        let roles = [&self.target, &self.prediction, &self.datetime, &self.id];
        for role in roles.into_iter().flatten() {
            if seen.contains(role.as_str()) {
                return Err(format!(
                    "column '{role}' cannot be both a role column and a monitored feature"
                ));
            }
        }

        Ok(())
    }
}

/// Layout of the reference CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataFormat {
    /// Field separator.
    #[serde(default = "default_separator")]
    pub separator: char,

    /// Whether the first line holds column names.
    #[serde(default = "default_header")]
    pub header: bool,
}

fn default_separator() -> char {
    ','
}

fn default_header() -> bool {
    true
}

impl Default for DataFormat {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            header: default_header(),
        }
    }
}

/// Configuration of a single monitored dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    /// Role of each column.
    pub column_mapping: ColumnMapping,

    /// Reference file layout.
    #[serde(default)]
    pub data_format: DataFormat,

    /// Monitors to run on every evaluation.
    #[validate(length(min = 1, message = "at least one monitor is required"))]
    pub monitors: Vec<MonitorKind>,
}

/// Complete configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitoringConfig {
    /// Global service parameters.
    pub service: ServiceOptions,

    /// Monitored datasets keyed by name.
    pub datasets: BTreeMap<String, DatasetConfig>,
}

impl MonitoringConfig {
    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Parses and validates configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML does not parse or fails validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::config::MonitoringConfig;
    ///
    /// let config = MonitoringConfig::from_yaml(r#"
    /// service:
    ///   datasets_path: datasets
    ///   use_reference: true
    ///   moving_reference: false
    ///   window_size: 30
    ///   calculation_period_sec: 10
    /// datasets:
    ///   houses:
    ///     column_mapping:
    ///       numerical_features: [bedrooms]
    ///     monitors: [data_drift]
    /// "#).unwrap();
    ///
    /// assert_eq!(config.service.window_size, 30);
    /// assert_eq!(config.datasets["houses"].data_format.separator, ',');
    /// ```
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Validate::validate(&self.service).map_err(|errors| ConfigError::Validation {
            section: "service".to_string(),
            errors,
        })?;
        Validate::validate(&self.service.data_drift).map_err(|errors| {
            ConfigError::Validation {
                section: "service.data_drift".to_string(),
                errors,
            }
        })?;

        if !self.service.use_reference {
            return Err(ConfigError::Invalid {
                section: "service".to_string(),
                message: "use_reference must be true, drift is always computed against the reference sample".to_string(),
            });
        }
        if self.service.moving_reference {
            return Err(ConfigError::Invalid {
                section: "service".to_string(),
                message: "moving_reference is not supported, the reference sample is fixed once loaded".to_string(),
            });
        }

        if self.datasets.is_empty() {
            return Err(ConfigError::Invalid {
                section: "datasets".to_string(),
                message: "at least one dataset must be configured".to_string(),
            });
        }

        for (name, dataset) in &self.datasets {
            let section = format!("datasets.{name}");
            Validate::validate(dataset).map_err(|errors| ConfigError::Validation {
                section: section.clone(),
                errors,
            })?;
            dataset
                .column_mapping
                .check()
                .map_err(|message| ConfigError::Invalid { section, message })?;
        }

        Ok(())
    }
}
