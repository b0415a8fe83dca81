//! Tabular CSV export
//!
//! Writes a [`DataTable`] as a flat CSV file and reads one back for the
//! metrics pass. Numeric columns are everything not named as a pass-through
//! column.

use crate::adapters::csv_reader;
use crate::error::AlignError;
use crate::table::{Column, DataTable, LabelColumn};
use crate::types::PhaseLabel;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// Write `table` with a header row
pub fn write_csv<W: Write>(table: &DataTable, output: W) -> Result<(), AlignError> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(table.headers())?;

    for row in 0..table.len() {
        let mut record: Vec<String> = Vec::with_capacity(2 + table.labels.len() + table.columns.len());
        record.push(table.elapsed_time[row].to_string());
        record.push(table.phase[row].to_string());
        record.extend(table.labels.iter().map(|l| l.values[row].clone()));
        record.extend(table.columns.iter().map(|c| c.values[row].to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Read a table previously written by [`write_csv`]
pub fn read_csv<R: Read>(input: R, label_names: &[String]) -> Result<DataTable, AlignError> {
    let mut reader = csv_reader(input);
    let headers = reader.headers()?.clone();

    for (position, required) in ["elapsed_time", "phase"].iter().enumerate() {
        if headers.get(position) != Some(*required) {
            return Err(AlignError::MissingColumn {
                stream: "data".to_string(),
                column: required.to_string(),
            });
        }
    }

    let mut table = DataTable::default();
    let mut slots: Vec<Slot> = Vec::new();
    for name in headers.iter().skip(2) {
        if label_names.iter().any(|l| l == name) {
            slots.push(Slot::Label(table.labels.len()));
            table.labels.push(LabelColumn {
                name: name.to_string(),
                values: Vec::new(),
            });
        } else {
            slots.push(Slot::Numeric(table.columns.len()));
            table.columns.push(Column {
                name: name.to_string(),
                values: Vec::new(),
            });
        }
    }

    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = idx + 1;

        let raw_time = record.get(0).unwrap_or("");
        let elapsed_time = raw_time
            .parse::<i64>()
            .map_err(|_| AlignError::format(raw_time, format!("non-integer elapsed_time in row {row}")))?;
        table.elapsed_time.push(elapsed_time);
        table.phase.push(PhaseLabel::parse(record.get(1).unwrap_or("")));

        for (offset, slot) in slots.iter().enumerate() {
            let cell = record.get(offset + 2).unwrap_or("");
            match *slot {
                Slot::Label(i) => table.labels[i].values.push(cell.to_string()),
                Slot::Numeric(i) => {
                    let value = cell.parse::<f64>().map_err(|_| AlignError::InvalidValue {
                        column: table.columns[i].name.clone(),
                        row,
                        value: cell.to_string(),
                    })?;
                    table.columns[i].values.push(value);
                }
            }
        }
    }

    Ok(table)
}

enum Slot {
    Label(usize),
    Numeric(usize),
}

/// Write `table` to `path`, replacing any existing file
pub fn write_table_file(table: &DataTable, path: &Path) -> Result<(), AlignError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    write_csv(table, BufWriter::new(file))
}

pub fn read_table_file(path: &Path, label_names: &[String]) -> Result<DataTable, AlignError> {
    let file = File::open(path).map_err(|source| AlignError::MissingFile {
        path: path.to_path_buf(),
        source,
    })?;
    read_csv(std::io::BufReader::new(file), label_names)
}
