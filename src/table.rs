//! Column-oriented data table
//!
//! The tagged merge output and every post-processing pass share this shape:
//! `elapsed_time`, `phase`, pass-through text columns, then numeric columns in
//! the order they were added.

use crate::error::AlignError;
use crate::types::{PhaseLabel, TaggedRow};

/// Text column copied from the DIY stream
#[derive(Debug, Clone, PartialEq)]
pub struct LabelColumn {
    pub name: String,
    pub values: Vec<String>,
}

/// Numeric column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    pub elapsed_time: Vec<i64>,
    pub phase: Vec<PhaseLabel>,
    pub labels: Vec<LabelColumn>,
    pub columns: Vec<Column>,
}

impl DataTable {
    /// Build a table from tagged rows.
    ///
    /// `label_names`, `channel_names` and `reference_names` name the entries of
    /// each row's `labels`, `channels` and `reference` vectors.
    pub fn from_tagged(
        rows: &[TaggedRow],
        label_names: &[String],
        channel_names: &[String],
        reference_names: &[String],
    ) -> Self {
        let labels = label_names
            .iter()
            .enumerate()
            .map(|(idx, name)| LabelColumn {
                name: name.clone(),
                values: rows.iter().map(|r| r.row.labels[idx].clone()).collect(),
            })
            .collect();

        let channels = channel_names.iter().enumerate().map(|(idx, name)| Column {
            name: name.clone(),
            values: rows.iter().map(|r| r.row.channels[idx]).collect(),
        });
        let reference = reference_names.iter().enumerate().map(|(idx, name)| Column {
            name: name.clone(),
            values: rows.iter().map(|r| r.row.reference[idx]).collect(),
        });

        Self {
            elapsed_time: rows.iter().map(|r| r.row.elapsed_time).collect(),
            phase: rows.iter().map(|r| r.phase.clone()).collect(),
            labels,
            columns: channels.chain(reference).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.elapsed_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elapsed_time.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Like [`DataTable::column`], failing with `MissingColumn`
    pub fn require(&self, name: &str) -> Result<&[f64], AlignError> {
        self.column(name).ok_or_else(|| AlignError::MissingColumn {
            stream: "data".to_string(),
            column: name.to_string(),
        })
    }

    /// Append a numeric column, replacing any existing column of that name
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.len());
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
    }

    /// Keep only the rows for which `keep(row_index)` is true
    pub fn retain_rows<F>(&mut self, keep: F)
    where
        F: Fn(usize) -> bool,
    {
        let mask: Vec<bool> = (0..self.len()).map(keep).collect();
        retain_by_mask(&mut self.elapsed_time, &mask);
        retain_by_mask(&mut self.phase, &mask);
        for label in &mut self.labels {
            retain_by_mask(&mut label.values, &mask);
        }
        for column in &mut self.columns {
            retain_by_mask(&mut column.values, &mask);
        }
    }

    /// Header row in output order
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec!["elapsed_time".to_string(), "phase".to_string()];
        headers.extend(self.labels.iter().map(|l| l.name.clone()));
        headers.extend(self.columns.iter().map(|c| c.name.clone()));
        headers
    }
}

fn retain_by_mask<T>(values: &mut Vec<T>, mask: &[bool]) {
    let mut idx = 0;
    values.retain(|_| {
        let keep = mask[idx];
        idx += 1;
        keep
    });
}
