//! Reference sample.
//!
//! The reference sample is the fixed baseline distribution of every monitored
//! feature. It is loaded once and exposes no mutating API.

use super::reader::{parse_numeric, CsvTable};
use super::DatasetError;
use crate::config::DataFormat;
use crate::models::FeatureRow;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// Baseline values of the monitored features.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSample {
    columns: BTreeMap<String, Vec<f64>>,
    rows: usize,
    hash: String,
}

impl ReferenceSample {
    /// Loads the monitored columns of a reference CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, holds no records, or lacks a
    /// monitored column.
    pub fn load(
        path: impl AsRef<Path>,
        format: &DataFormat,
        features: &[String],
    ) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let table = CsvTable::read(path, format)?;
        Self::from_table(&table, features, &path.display().to_string())
    }

    /// Extracts the monitored columns from a parsed table.
    ///
    /// Cells that do not parse as numbers are skipped column by column.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty or lacks a monitored column.
    pub fn from_table(
        table: &CsvTable,
        features: &[String],
        source: &str,
    ) -> Result<Self, DatasetError> {
        if table.is_empty() {
            return Err(DatasetError::EmptyReference(source.to_string()));
        }

        let mut columns = BTreeMap::new();
        for feature in features {
            let index = table
                .column_index(feature)
                .ok_or_else(|| DatasetError::MissingColumn {
                    column: feature.clone(),
                    path: source.to_string(),
                })?;
            let values: Vec<f64> = table.column_cells(index).filter_map(parse_numeric).collect();

            let skipped = table.len() - values.len();
            if skipped > 0 {
                tracing::warn!(
                    source,
                    feature = %feature,
                    skipped,
                    "Skipped non-numeric reference cells"
                );
            }
            columns.insert(feature.clone(), values);
        }

        Ok(Self::new(columns, table.len()))
    }

    /// Builds a reference sample from feature rows.
    #[must_use]
    pub fn from_rows(rows: &[FeatureRow], features: &[String]) -> Self {
        let columns = features
            .iter()
            .map(|f| (f.clone(), rows.iter().filter_map(|r| r.get(f)).collect()))
            .collect();
        Self::new(columns, rows.len())
    }

    fn new(columns: BTreeMap<String, Vec<f64>>, rows: usize) -> Self {
        let hash = digest(&columns);
        Self {
            columns,
            rows,
            hash,
        }
    }

    /// Values of a monitored feature.
    #[must_use]
    pub fn column(&self, feature: &str) -> Option<&[f64]> {
        self.columns.get(feature).map(Vec::as_slice)
    }

    /// Number of records the sample was built from.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Number of monitored features.
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.columns.len()
    }

    /// Hex-encoded SHA-256 of the sample contents.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

fn digest(columns: &BTreeMap<String, Vec<f64>>) -> String {
    let mut hasher = Sha256::new();
    for (name, values) in columns {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        for value in values {
            hasher.update(value.to_le_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUSES: &str = "\
price,bedrooms,condition
221900,3,3
538000,3,5
180000,n/a,3
";

    fn features() -> Vec<String> {
        vec!["bedrooms".to_string(), "condition".to_string()]
    }

    #[test]
    fn test_from_table_keeps_monitored_columns() {
        let table = CsvTable::parse(HOUSES, &DataFormat::default()).unwrap();

        let reference = ReferenceSample::from_table(&table, &features(), "houses").unwrap();

        assert_eq!(reference.row_count(), 3);
        assert_eq!(reference.feature_count(), 2);
        assert_eq!(reference.column("bedrooms"), Some(&[3.0, 3.0][..]));
        assert_eq!(reference.column("condition"), Some(&[3.0, 5.0, 3.0][..]));
        assert!(reference.column("price").is_none());
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let table = CsvTable::parse(HOUSES, &DataFormat::default()).unwrap();
        let features = vec!["sqft_living".to_string()];

        let result = ReferenceSample::from_table(&table, &features, "houses");

        assert!(matches!(
            result,
            Err(DatasetError::MissingColumn { ref column, .. }) if column == "sqft_living"
        ));
    }

    #[test]
    fn test_empty_reference_is_an_error() {
        let table = CsvTable::parse("bedrooms,condition\n", &DataFormat::default()).unwrap();
        let result = ReferenceSample::from_table(&table, &features(), "houses");
        assert!(matches!(result, Err(DatasetError::EmptyReference(_))));
    }

    #[test]
    fn test_hash_is_stable_and_content_sensitive() {
        let rows = vec![
            FeatureRow::new().with_value("bedrooms", 3.0).with_value("condition", 3.0),
            FeatureRow::new().with_value("bedrooms", 2.0).with_value("condition", 4.0),
        ];
        let a = ReferenceSample::from_rows(&rows, &features());
        let b = ReferenceSample::from_rows(&rows, &features());
        let c = ReferenceSample::from_rows(&rows[..1], &features());

        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
        assert_eq!(a.hash().len(), 64);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reference.csv");
        std::fs::write(&path, HOUSES).unwrap();

        let reference = ReferenceSample::load(&path, &DataFormat::default(), &features()).unwrap();
        assert_eq!(reference.row_count(), 3);
    }
}
