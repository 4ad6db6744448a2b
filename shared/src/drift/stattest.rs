//! Two-sample statistical tests used by the drift monitors.

use super::DriftError;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of a two-sample test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// The test statistic.
    pub statistic: f64,
    /// Probability of a statistic at least this extreme if both samples share a distribution.
    pub p_value: f64,
}

/// Two-sample Kolmogorov-Smirnov test with the asymptotic p-value.
///
/// # Errors
///
/// Returns an error if either sample is empty.
///
/// # Examples
///
/// ```
/// use shared::drift::stattest::ks_2samp;
///
/// let same = ks_2samp(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
/// assert_eq!(same.statistic, 0.0);
/// assert_eq!(same.p_value, 1.0);
/// ```
pub fn ks_2samp(reference: &[f64], current: &[f64]) -> Result<TestResult, DriftError> {
    if reference.is_empty() || current.is_empty() {
        return Err(DriftError::InsufficientData(
            "KS test needs two non-empty samples".to_string(),
        ));
    }

    let mut a = reference.to_vec();
    let mut b = current.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    #[allow(clippy::cast_precision_loss)]
    let (n, m) = (a.len() as f64, b.len() as f64);

    let (mut i, mut j) = (0, 0);
    let mut statistic: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        #[allow(clippy::cast_precision_loss)]
        let gap = (i as f64 / n - j as f64 / m).abs();
        statistic = statistic.max(gap);
    }

    let en = (n * m / (n + m)).sqrt();
    let p_value = kolmogorov_survival((en + 0.12 + 0.11 / en) * statistic);

    Ok(TestResult { statistic, p_value })
}

/// Survival function of the Kolmogorov distribution.
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda < 1e-3 {
        return 1.0;
    }

    let a2 = -2.0 * lambda * lambda;
    let mut sign = 2.0;
    let mut sum = 0.0;
    let mut previous: f64 = 0.0;

    for k in 1..=100 {
        let k = f64::from(k);
        let term = sign * (a2 * k * k).exp();
        sum += term;
        if term.abs() <= 1e-10 * previous.abs() || term.abs() <= 1e-16 * sum.abs() {
            return sum.clamp(0.0, 1.0);
        }
        sign = -sign;
        previous = term;
    }

    // The series did not converge; this only happens for tiny lambda.
    1.0
}

/// Chi-square goodness-of-fit test of the current category counts against the
/// category shares observed in the reference.
///
/// A category that appears only in the current sample has an expected count of
/// zero, which makes the statistic infinite and the p-value zero.
///
/// # Errors
///
/// Returns an error if either sample is empty or the distribution cannot be built.
pub fn chi_square(reference: &[f64], current: &[f64]) -> Result<TestResult, DriftError> {
    if reference.is_empty() || current.is_empty() {
        return Err(DriftError::InsufficientData(
            "chi-square test needs two non-empty samples".to_string(),
        ));
    }

    let reference_counts = category_counts(reference);
    let current_counts = category_counts(current);
    let categories: BTreeSet<&String> = reference_counts
        .keys()
        .chain(current_counts.keys())
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let (n_reference, n_current) = (reference.len() as f64, current.len() as f64);

    let mut statistic = 0.0;
    for category in &categories {
        #[allow(clippy::cast_precision_loss)]
        let expected =
            reference_counts.get(*category).copied().unwrap_or(0) as f64 / n_reference * n_current;
        #[allow(clippy::cast_precision_loss)]
        let observed = current_counts.get(*category).copied().unwrap_or(0) as f64;

        if expected == 0.0 {
            statistic = f64::INFINITY;
            break;
        }
        statistic += (observed - expected).powi(2) / expected;
    }

    let degrees_of_freedom = categories.len().saturating_sub(1);
    let p_value = if degrees_of_freedom == 0 {
        1.0
    } else if statistic.is_infinite() {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let distribution = ChiSquared::new(degrees_of_freedom as f64)
            .map_err(|e| DriftError::Statistics(e.to_string()))?;
        distribution.sf(statistic)
    };

    Ok(TestResult { statistic, p_value })
}

fn category_counts(values: &[f64]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(category_key(*value)).or_insert(0) += 1;
    }
    counts
}

/// Integral values share a key regardless of how they were written (`3` vs `3.0`).
fn category_key(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        let integral = value as i64;
        integral.to_string()
    } else {
        value.to_string()
    }
}
