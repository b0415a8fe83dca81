//! Bio reference stream adapter
//!
//! Reads the thermal reference export: an `Elapsed Time` clock string and the
//! reference channel.

use crate::config::BioStreamConfig;
use crate::error::AlignError;
use crate::types::{RawReading, RawTimestamp, StreamKind};
use std::io::Read;

use super::{column_indices, csv_reader, numeric_cell, StreamAdapter};

/// Bio stream adapter
#[derive(Debug, Clone)]
pub struct BioAdapter {
    timestamp_column: String,
    reference_channel: String,
}

impl Default for BioAdapter {
    fn default() -> Self {
        Self::new(&BioStreamConfig::default())
    }
}

impl BioAdapter {
    pub fn new(config: &BioStreamConfig) -> Self {
        Self {
            timestamp_column: config.timestamp_column.clone(),
            reference_channel: config.reference_channel.clone(),
        }
    }
}

impl StreamAdapter for BioAdapter {
    fn kind(&self) -> StreamKind {
        StreamKind::Bio
    }

    fn required_columns(&self) -> Vec<String> {
        vec![self.timestamp_column.clone(), self.reference_channel.clone()]
    }

    fn parse(&self, input: &mut dyn Read) -> Result<Vec<RawReading>, AlignError> {
        let mut reader = csv_reader(input);
        let headers = reader.headers()?.clone();
        let indices = column_indices(&headers, &self.required_columns(), self.kind())?;
        let (clock, reference) = (indices[0], indices[1]);

        let mut readings = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            readings.push(RawReading {
                timestamp: RawTimestamp::Clock(record.get(clock).unwrap_or("").to_string()),
                values: vec![numeric_cell(&record, reference, &self.reference_channel, idx + 1)?],
                labels: Vec::new(),
            });
        }

        Ok(readings)
    }
}
