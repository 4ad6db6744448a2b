//! CSV dataset reading.
//!
//! Reads reference and production files into an in-memory table. Files without
//! a header get positional column names (`"0"`, `"1"`, ...).

use super::DatasetError;
use crate::config::DataFormat;
use serde_json::{Map, Number, Value};
use std::path::Path;

/// An in-memory CSV file.
#[derive(Debug, Clone)]
pub struct CsvTable {
    headers: Vec<String>,
    records: Vec<csv::StringRecord>,
}

impl CsvTable {
    /// Reads a CSV file using the given layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the separator is not a single-byte character, the file
    /// cannot be opened, or a record is malformed.
    pub fn read(path: impl AsRef<Path>, format: &DataFormat) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let reader = builder(format)?
            .from_path(path)
            .map_err(|source| DatasetError::Csv {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_reader(reader, format).map_err(|source| DatasetError::Csv {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parses CSV content held in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the separator is invalid or a record is malformed.
    pub fn parse(contents: &str, format: &DataFormat) -> Result<Self, DatasetError> {
        let reader = builder(format)?.from_reader(contents.as_bytes());
        Self::from_reader(reader, format).map_err(|source| DatasetError::Csv {
            path: "<memory>".to_string(),
            source,
        })
    }

    fn from_reader<R: std::io::Read>(
        mut reader: csv::Reader<R>,
        format: &DataFormat,
    ) -> Result<Self, csv::Error> {
        let records = reader
            .records()
            .collect::<Result<Vec<csv::StringRecord>, csv::Error>>()?;

        let headers = if format.header {
            reader
                .headers()?
                .iter()
                .map(|h| h.trim().to_string())
                .collect()
        } else {
            let width = records.first().map_or(0, csv::StringRecord::len);
            (0..width).map(|i| i.to_string()).collect()
        };

        Ok(Self { headers, records })
    }

    /// Column names in file order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the file holds no data records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the position of a column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Iterates over the raw cells of a column.
    pub fn column_cells(&self, index: usize) -> impl Iterator<Item = &str> {
        self.records.iter().filter_map(move |r| r.get(index))
    }

    /// Converts a record into a flat JSON object keyed by column name.
    ///
    /// Returns `None` if `index` is out of range.
    #[must_use]
    pub fn record_json(&self, index: usize) -> Option<Map<String, Value>> {
        let record = self.records.get(index)?;
        Some(
            self.headers
                .iter()
                .zip(record.iter())
                .map(|(name, cell)| (name.clone(), cell_to_json(cell)))
                .collect(),
        )
    }
}

fn builder(format: &DataFormat) -> Result<csv::ReaderBuilder, DatasetError> {
    let delimiter = u8::try_from(format.separator)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(DatasetError::InvalidSeparator(format.separator))?;

    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(delimiter)
        .has_headers(format.header)
        .trim(csv::Trim::All);
    Ok(builder)
}

/// Parses a cell as a number; `True`/`False` (any case) become `1.0`/`0.0`.
#[must_use]
pub fn parse_numeric(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.eq_ignore_ascii_case("true") {
        return Some(1.0);
    }
    if cell.eq_ignore_ascii_case("false") {
        return Some(0.0);
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Converts a cell into the JSON value sent over the wire.
///
/// Empty cells become `null`, integers and finite floats become numbers, and
/// everything else stays a string.
#[must_use]
pub fn cell_to_json(cell: &str) -> Value {
    let cell = cell.trim();
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = cell.parse::<i64>() {
        return Value::Number(int.into());
    }
    cell.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::String(cell.to_string()), Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const HOUSES: &str = "\
date,price,bedrooms,condition
20141013T000000,221900,3,3
20141209T000000,538000,3,3
20150225T000000,180000,2,3
";

    #[test]
    fn test_parse_with_header() {
        let table = CsvTable::parse(HOUSES, &DataFormat::default()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.headers(), ["date", "price", "bedrooms", "condition"]);
        assert_eq!(table.column_index("bedrooms"), Some(2));
        assert_eq!(table.column_index("sqft"), None);

        let bedrooms: Vec<&str> = table.column_cells(2).collect();
        assert_eq!(bedrooms, vec!["3", "3", "2"]);
    }

    #[test]
    fn test_parse_without_header() {
        let format = DataFormat {
            separator: ';',
            header: false,
        };
        let table = CsvTable::parse("1;2\n3;4\n", &format).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.headers(), ["0", "1"]);
    }

    #[test]
    fn test_record_json() {
        let table = CsvTable::parse(HOUSES, &DataFormat::default()).unwrap();

        let record = Value::Object(table.record_json(2).unwrap());

        assert_eq!(
            record,
            json!({
                "date": "20150225T000000",
                "price": 180_000,
                "bedrooms": 2,
                "condition": 3
            })
        );
        assert!(table.record_json(3).is_none());
    }

    #[test]
    fn test_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(HOUSES.as_bytes()).unwrap();

        let table = CsvTable::read(file.path(), &DataFormat::default()).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_read_missing_file() {
        let result = CsvTable::read("/nonexistent/reference.csv", &DataFormat::default());
        assert!(matches!(result, Err(DatasetError::Csv { .. })));
    }

    #[test]
    fn test_ragged_record_is_rejected() {
        let result = CsvTable::parse("a,b\n1,2\n3\n", &DataFormat::default());
        assert!(matches!(result, Err(DatasetError::Csv { .. })));
    }

    #[test]
    fn test_non_ascii_separator_is_rejected() {
        let format = DataFormat {
            separator: '§',
            header: true,
        };
        let result = CsvTable::parse("a§b\n", &format);
        assert!(matches!(result, Err(DatasetError::InvalidSeparator('§'))));
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric(" 2.5 "), Some(2.5));
        assert_eq!(parse_numeric("True"), Some(1.0));
        assert_eq!(parse_numeric("false"), Some(0.0));
        assert_eq!(parse_numeric("NaN"), None);
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("n/a"), None);
    }

    #[test]
    fn test_cell_to_json() {
        assert_eq!(cell_to_json(""), Value::Null);
        assert_eq!(cell_to_json("3"), json!(3));
        assert_eq!(cell_to_json("1.5"), json!(1.5));
        assert_eq!(cell_to_json("inf"), json!("inf"));
        assert_eq!(cell_to_json("Seattle"), json!("Seattle"));
    }
}
