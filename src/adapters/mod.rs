//! Sensor stream adapters
//!
//! This module provides adapters that read each stream's CSV export and map
//! its rows to [`RawReading`]s in the stream's configured column order.

mod bio;
mod diy;

pub use bio::BioAdapter;
pub use diy::DiyAdapter;

use crate::error::AlignError;
use crate::types::{RawReading, StreamKind};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Trait for stream adapters
pub trait StreamAdapter {
    /// Which stream this adapter reads
    fn kind(&self) -> StreamKind;

    /// Columns that must be present in the header
    fn required_columns(&self) -> Vec<String>;

    /// Parse CSV rows into raw readings
    fn parse(&self, input: &mut dyn Read) -> Result<Vec<RawReading>, AlignError>;

    /// Open `path` and parse it; the file is closed before returning
    fn read_file(&self, path: &Path) -> Result<Vec<RawReading>, AlignError> {
        let file = File::open(path).map_err(|source| AlignError::MissingFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        self.parse(&mut reader)
    }

    /// Check that `path` exists and carries every required column
    fn check_header(&self, path: &Path) -> Result<(), AlignError> {
        let file = File::open(path).map_err(|source| AlignError::MissingFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = csv_reader(BufReader::new(file));
        let headers = reader.headers()?.clone();
        column_indices(&headers, &self.required_columns(), self.kind())?;
        Ok(())
    }
}

pub(crate) fn csv_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input)
}

/// Resolve each of `columns` to its position in `headers`
pub(crate) fn column_indices(
    headers: &csv::StringRecord,
    columns: &[String],
    kind: StreamKind,
) -> Result<Vec<usize>, AlignError> {
    columns
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h == column.as_str())
                .ok_or_else(|| AlignError::MissingColumn {
                    stream: kind.to_string(),
                    column: column.clone(),
                })
        })
        .collect()
}

/// Parse a numeric cell; `row` is the 1-based data row
pub(crate) fn numeric_cell(
    record: &csv::StringRecord,
    index: usize,
    column: &str,
    row: usize,
) -> Result<f64, AlignError> {
    let raw = record.get(index).unwrap_or("");
    raw.parse::<f64>().map_err(|_| AlignError::InvalidValue {
        column: column.to_string(),
        row,
        value: raw.to_string(),
    })
}
