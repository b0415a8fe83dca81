//! DIY sensor stream adapter
//!
//! Reads the mechanical sensor export: an integer `tod` tick column, one
//! numeric column per channel and text pass-through columns.

use crate::config::DiyStreamConfig;
use crate::error::AlignError;
use crate::types::{RawReading, RawTimestamp, StreamKind};
use std::io::Read;

use super::{column_indices, csv_reader, numeric_cell, StreamAdapter};

/// DIY stream adapter
#[derive(Debug, Clone, Default)]
pub struct DiyAdapter {
    config: DiyStreamConfig,
}

impl DiyAdapter {
    pub fn new(config: DiyStreamConfig) -> Self {
        Self { config }
    }
}

impl StreamAdapter for DiyAdapter {
    fn kind(&self) -> StreamKind {
        StreamKind::Diy
    }

    fn required_columns(&self) -> Vec<String> {
        let mut columns = vec![self.config.timestamp_column.clone()];
        columns.extend(self.config.channels.iter().cloned());
        columns.extend(self.config.passthrough_columns.iter().cloned());
        columns
    }

    fn parse(&self, input: &mut dyn Read) -> Result<Vec<RawReading>, AlignError> {
        let mut reader = csv_reader(input);
        let headers = reader.headers()?.clone();

        let tod = column_indices(&headers, &[self.config.timestamp_column.clone()], self.kind())?[0];
        let channels = column_indices(&headers, &self.config.channels, self.kind())?;
        let passthrough = column_indices(&headers, &self.config.passthrough_columns, self.kind())?;

        let mut readings = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let row = idx + 1;

            let raw_tick = record.get(tod).unwrap_or("");
            let tick = raw_tick
                .parse::<i64>()
                .map_err(|_| AlignError::format(raw_tick, format!("non-integer tick in row {row}")))?;

            let values = channels
                .iter()
                .zip(&self.config.channels)
                .map(|(&i, name)| numeric_cell(&record, i, name, row))
                .collect::<Result<Vec<_>, _>>()?;

            let labels = passthrough
                .iter()
                .map(|&i| record.get(i).unwrap_or("").to_string())
                .collect();

            readings.push(RawReading {
                timestamp: RawTimestamp::Ticks(tick),
                values,
                labels,
            });
        }

        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_diy_csv() -> &'static str {
        "participant,group,tod,flex_chest,flex_abdomen,cord_chest,cord_abdomen,fabric_chest,fabric_abdomen\n\
         1,A,5000,512,498,600,610,300,305\n\
         1,A,5040,515,497,1500,611,301,306\n"
    }

    #[test]
    fn test_parse_diy_rows() {
        let readings = DiyAdapter::default().parse(&mut sample_diy_csv().as_bytes()).unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].timestamp, RawTimestamp::Ticks(5000));
        assert_eq!(readings[1].values, vec![515.0, 497.0, 1500.0, 611.0, 301.0, 306.0]);
        assert_eq!(readings[0].labels, vec!["1".to_string(), "A".to_string()]);
    }

    #[test]
    fn test_missing_channel_column() {
        let csv = "participant,group,tod,flex_chest\n1,A,0,5\n";
        let err = DiyAdapter::default().parse(&mut csv.as_bytes()).unwrap_err();
        assert!(matches!(err, AlignError::MissingColumn { ref column, .. } if column == "flex_abdomen"));
    }

    #[test]
    fn test_bad_tick_is_format_error() {
        let csv = "participant,group,tod,flex_chest,flex_abdomen,cord_chest,cord_abdomen,fabric_chest,fabric_abdomen\n\
                   1,A,12:00,1,1,1,1,1,1\n";
        let err = DiyAdapter::default().parse(&mut csv.as_bytes()).unwrap_err();
        assert!(matches!(err, AlignError::Format { .. }));
    }

    #[test]
    fn test_non_numeric_channel() {
        let csv = "participant,group,tod,flex_chest,flex_abdomen,cord_chest,cord_abdomen,fabric_chest,fabric_abdomen\n\
                   1,A,0,1,1,x,1,1,1\n";
        let err = DiyAdapter::default().parse(&mut csv.as_bytes()).unwrap_err();
        assert!(matches!(err, AlignError::InvalidValue { ref column, row: 1, .. } if column == "cord_chest"));
    }
}
