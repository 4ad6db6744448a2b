//! Dataset files.
//!
//! Reading of the CSV files under the datasets directory: reference samples for
//! the monitoring service and production rows for traffic replay.

pub mod reader;
pub mod reference;

pub use reader::{cell_to_json, parse_numeric, CsvTable};
pub use reference::ReferenceSample;

use thiserror::Error;

/// Errors that can occur while reading dataset files.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The CSV file could not be opened or parsed.
    #[error("Failed to read CSV {path}: {source}")]
    Csv {
        /// Path of the file.
        path: String,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// The configured separator is not a single ASCII character.
    #[error("Separator {0:?} is not a single ASCII character")]
    InvalidSeparator(char),

    /// A monitored column is absent from the file.
    #[error("Column '{column}' not found in {path}")]
    MissingColumn {
        /// The missing column.
        column: String,
        /// Path of the file.
        path: String,
    },

    /// The reference file holds no records.
    #[error("Reference sample {0} is empty")]
    EmptyReference(String),
}
