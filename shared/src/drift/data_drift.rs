//! Data drift monitor.
//!
//! Compares every monitored feature of the current window against the reference
//! sample: numerical features with a Kolmogorov-Smirnov test, categorical ones
//! with a chi-square test.

use super::stattest::{chi_square, ks_2samp, TestResult};
use super::{DriftError, EvaluationInput, Monitor};
use crate::config::{DataDriftOptions, MonitorKind};
use crate::models::MetricSample;
use serde::{Deserialize, Serialize};

/// Metric names emitted by the data drift monitor.
pub mod metric_names {
    /// Share of monitored features that drifted.
    pub const SHARE_DRIFTED_FEATURES: &str = "data_drift:share_drifted_features";
    /// Number of monitored features that drifted.
    pub const N_DRIFTED_FEATURES: &str = "data_drift:n_drifted_features";
    /// Whether the dataset as a whole drifted.
    pub const DATASET_DRIFT: &str = "data_drift:dataset_drift";
    /// Per-feature p-value.
    pub const P_VALUE: &str = "data_drift:p_value";
}

/// Statistical type of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureType {
    /// Continuous values, tested with Kolmogorov-Smirnov.
    #[serde(rename = "num")]
    Numerical,
    /// Discrete categories, tested with chi-square.
    #[serde(rename = "cat")]
    Categorical,
}

impl FeatureType {
    /// Returns the label value used in exported metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Numerical => "num",
            Self::Categorical => "cat",
        }
    }
}

/// Drift result of a single feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDrift {
    /// Feature name.
    pub feature: String,
    /// Statistical type of the feature.
    pub feature_type: FeatureType,
    /// Test outcome.
    pub test: TestResult,
    /// Whether the p-value fell below the drift threshold.
    pub drifted: bool,
}

/// Outcome of one data drift evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDriftReport {
    /// Per-feature results, numerical features first.
    pub features: Vec<FeatureDrift>,
    /// Number of drifted features.
    pub n_drifted_features: usize,
    /// Share of drifted features among the tested ones.
    pub share_drifted_features: f64,
    /// Whether the share reached the configured drift share.
    pub dataset_drift: bool,
}

impl DataDriftReport {
    /// Converts the report into metric samples.
    #[must_use]
    pub fn to_samples(&self) -> Vec<MetricSample> {
        #[allow(clippy::cast_precision_loss)]
        let n_drifted = self.n_drifted_features as f64;

        let mut samples = vec![
            MetricSample::new(
                metric_names::SHARE_DRIFTED_FEATURES,
                self.share_drifted_features,
            )
            .with_description("Share of monitored features that drifted"),
            MetricSample::new(metric_names::N_DRIFTED_FEATURES, n_drifted)
                .with_description("Number of monitored features that drifted"),
            MetricSample::new(metric_names::DATASET_DRIFT, self.dataset_drift)
                .with_description("Whether the dataset drifted from the reference"),
        ];

        samples.extend(self.features.iter().map(|f| {
            MetricSample::new(metric_names::P_VALUE, f.test.p_value)
                .with_label("feature", f.feature.clone())
                .with_label("feature_type", f.feature_type.as_str())
                .with_description("P-value of the per-feature drift test")
        }));

        samples
    }
}

/// Per-feature distribution drift monitor.
#[derive(Debug, Clone)]
pub struct DataDriftMonitor {
    options: DataDriftOptions,
}

impl DataDriftMonitor {
    /// Creates a monitor with the given thresholds.
    #[must_use]
    pub fn new(options: DataDriftOptions) -> Self {
        Self { options }
    }

    /// Runs the per-feature tests and aggregates them.
    ///
    /// Features without any value in the current window are left out of the
    /// report.
    ///
    /// # Errors
    ///
    /// Returns an error if a monitored feature has no reference column, if no
    /// feature could be tested, or if a test fails.
    pub fn analyze(&self, input: &EvaluationInput<'_>) -> Result<DataDriftReport, DriftError> {
        let threshold = 1.0 - self.options.confidence;
        let mut features = Vec::new();

        for feature in input.column_mapping.monitored_features() {
            let reference = input
                .reference
                .column(&feature)
                .ok_or_else(|| DriftError::MissingReferenceColumn(feature.clone()))?;
            let current: Vec<f64> = input
                .current
                .iter()
                .filter_map(|row| row.get(&feature))
                .collect();

            if current.is_empty() || reference.is_empty() {
                tracing::warn!(
                    feature = %feature,
                    reference_len = reference.len(),
                    current_len = current.len(),
                    "Not enough values to test feature for drift"
                );
                continue;
            }

            let (feature_type, test) = if input.column_mapping.is_categorical(&feature) {
                (FeatureType::Categorical, chi_square(reference, &current)?)
            } else {
                (FeatureType::Numerical, ks_2samp(reference, &current)?)
            };

            features.push(FeatureDrift {
                feature,
                feature_type,
                drifted: test.p_value < threshold,
                test,
            });
        }

        if features.is_empty() {
            return Err(DriftError::InsufficientData(
                "no monitored feature has values in both samples".to_string(),
            ));
        }

        let n_drifted_features = features.iter().filter(|f| f.drifted).count();
        #[allow(clippy::cast_precision_loss)]
        let share_drifted_features = n_drifted_features as f64 / features.len() as f64;

        Ok(DataDriftReport {
            features,
            n_drifted_features,
            share_drifted_features,
            dataset_drift: share_drifted_features >= self.options.drift_share,
        })
    }
}

impl Monitor for DataDriftMonitor {
    fn kind(&self) -> MonitorKind {
        MonitorKind::DataDrift
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<Vec<MetricSample>, DriftError> {
        let report = self.analyze(input)?;
        if report.dataset_drift {
            tracing::info!(
                n_drifted_features = report.n_drifted_features,
                share_drifted_features = report.share_drifted_features,
                "Data drift detected"
            );
        }
        Ok(report.to_samples())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnMapping;
    use crate::dataset::ReferenceSample;
    use crate::models::{FeatureRow, MetricValue};

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            numerical_features: vec!["bedrooms".to_string()],
            categorical_features: vec!["condition".to_string()],
            ..ColumnMapping::default()
        }
    }

    fn rows(bedrooms: impl Fn(i32) -> f64, condition: impl Fn(i32) -> f64) -> Vec<FeatureRow> {
        (0..100)
            .map(|i| {
                FeatureRow::new()
                    .with_value("bedrooms", bedrooms(i))
                    .with_value("condition", condition(i))
            })
            .collect()
    }

    fn reference() -> ReferenceSample {
        let rows = rows(|i| f64::from(i % 5 + 1), |i| f64::from(i % 3 + 3));
        ReferenceSample::from_rows(&rows, &mapping().monitored_features())
    }

    fn monitor(drift_share: f64) -> DataDriftMonitor {
        DataDriftMonitor::new(DataDriftOptions {
            confidence: 0.95,
            drift_share,
        })
    }

    #[test]
    fn test_no_drift_on_reference_like_window() {
        let reference = reference();
        let mapping = mapping();
        let current = rows(|i| f64::from(i % 5 + 1), |i| f64::from(i % 3 + 3));
        let input = EvaluationInput {
            reference: &reference,
            current: &current,
            column_mapping: &mapping,
        };

        let report = monitor(0.5).analyze(&input).unwrap();

        assert_eq!(report.features.len(), 2);
        assert_eq!(report.n_drifted_features, 0);
        assert!(!report.dataset_drift);
        assert_eq!(report.features[0].feature, "bedrooms");
        assert_eq!(report.features[0].feature_type, FeatureType::Numerical);
        assert_eq!(report.features[1].feature_type, FeatureType::Categorical);
    }

    #[test]
    fn test_drift_on_shifted_window() {
        let reference = reference();
        let mapping = mapping();
        let current = rows(|i| f64::from(i % 5 + 4), |i| f64::from(i % 3 + 3));
        let input = EvaluationInput {
            reference: &reference,
            current: &current,
            column_mapping: &mapping,
        };

        let report = monitor(0.5).analyze(&input).unwrap();

        assert_eq!(report.n_drifted_features, 1);
        assert!((report.share_drifted_features - 0.5).abs() < f64::EPSILON);
        assert!(report.dataset_drift);
        assert!(report.features[0].drifted);
        assert!(!report.features[1].drifted);

        // With drift_share = 1 every feature has to drift.
        assert!(!monitor(1.0).analyze(&input).unwrap().dataset_drift);
    }

    #[test]
    fn test_feature_without_current_values_is_skipped() {
        let reference = reference();
        let mapping = mapping();
        let current: Vec<FeatureRow> = (0..10)
            .map(|i| FeatureRow::new().with_value("bedrooms", f64::from(i % 5 + 1)))
            .collect();
        let input = EvaluationInput {
            reference: &reference,
            current: &current,
            column_mapping: &mapping,
        };

        let report = monitor(0.5).analyze(&input).unwrap();

        assert_eq!(report.features.len(), 1);
        assert_eq!(report.features[0].feature, "bedrooms");
    }

    #[test]
    fn test_empty_window_is_an_error() {
        let reference = reference();
        let mapping = mapping();
        let input = EvaluationInput {
            reference: &reference,
            current: &[],
            column_mapping: &mapping,
        };

        let result = monitor(0.5).analyze(&input);
        assert!(matches!(result, Err(DriftError::InsufficientData(_))));
    }

    #[test]
    fn test_missing_reference_column_is_an_error() {
        let reference = ReferenceSample::from_rows(&[], &["bedrooms".to_string()]);
        let mapping = mapping();
        let current = rows(|_| 1.0, |_| 3.0);
        let input = EvaluationInput {
            reference: &reference,
            current: &current,
            column_mapping: &mapping,
        };

        let result = monitor(0.5).analyze(&input);
        assert!(matches!(
            result,
            Err(DriftError::MissingReferenceColumn(ref f)) if f == "condition"
        ));
    }

    #[test]
    fn test_evaluate_emits_samples() {
        let reference = reference();
        let mapping = mapping();
        let current = rows(|i| f64::from(i % 5 + 4), |i| f64::from(i % 3 + 3));
        let input = EvaluationInput {
            reference: &reference,
            current: &current,
            column_mapping: &mapping,
        };

        let samples = monitor(0.5).evaluate(&input).unwrap();

        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0].name, metric_names::SHARE_DRIFTED_FEATURES);
        assert_eq!(samples[1].value, MetricValue::Number(1.0));
        assert_eq!(samples[2].value, MetricValue::Flag(true));

        let p_value = &samples[3];
        assert_eq!(p_value.name, metric_names::P_VALUE);
        assert_eq!(p_value.labels["feature"], "bedrooms");
        assert_eq!(p_value.labels["feature_type"], "num");
        assert_eq!(samples[4].labels["feature_type"], "cat");
    }
}
