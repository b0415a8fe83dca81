//! Time binning and aggregation
//!
//! Readings are grouped into half-open windows `[key*w, key*w + w)` and each
//! occupied window is reduced to a single row holding the per-column mean.
//! Assignment and reduction are separate steps so that per-bin filters can
//! run in between.

use crate::stats;
use crate::types::{BinnedRow, Reading};
use std::collections::BTreeMap;

/// Bin key for an elapsed time (floor division)
pub fn bin_key(elapsed_time: i64, width: i64) -> i64 {
    elapsed_time.div_euclid(width)
}

/// Readings grouped by bin key, ascending
#[derive(Debug, Clone)]
pub struct Bins {
    width: i64,
    bins: BTreeMap<i64, Vec<Reading>>,
}

impl Bins {
    /// Group readings by bin key, preserving input order within each bin
    pub fn assign(readings: Vec<Reading>, width: i64) -> Self {
        let mut bins: BTreeMap<i64, Vec<Reading>> = BTreeMap::new();
        for reading in readings {
            bins.entry(bin_key(reading.elapsed_time, width))
                .or_default()
                .push(reading);
        }
        Self { width, bins }
    }

    /// Number of bins (including any emptied by filtering)
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Total readings across all bins
    pub fn reading_count(&self) -> usize {
        self.bins.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &[Reading])> {
        self.bins.iter().map(|(key, rows)| (*key, rows.as_slice()))
    }

    /// Apply `f` to every bin's readings in key order
    pub fn for_each_bin_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(i64, &mut Vec<Reading>),
    {
        for (key, rows) in self.bins.iter_mut() {
            f(*key, rows);
        }
    }

    /// Reduce each non-empty bin to one row of column means
    pub fn reduce(self) -> Vec<BinnedRow> {
        let width = self.width;
        self.bins
            .into_iter()
            .filter_map(|(key, rows)| reduce_bin(key * width, &rows))
            .collect()
    }
}

fn reduce_bin(elapsed_time: i64, rows: &[Reading]) -> Option<BinnedRow> {
    let first = rows.first()?;
    let values = (0..first.values.len())
        .map(|column| {
            let column_values: Vec<f64> = rows.iter().map(|r| r.values[column]).collect();
            stats::mean(&column_values).unwrap_or(f64::NAN)
        })
        .collect();

    Some(BinnedRow {
        elapsed_time,
        values,
        labels: first.labels.clone(),
    })
}

/// Fixed-width binner
pub struct Binner {
    width: i64,
}

impl Binner {
    pub fn new(width: i64) -> Self {
        Self { width }
    }

    pub fn assign(&self, readings: Vec<Reading>) -> Bins {
        Bins::assign(readings, self.width)
    }

    /// Assign and reduce in one step
    pub fn aggregate(&self, readings: Vec<Reading>) -> Vec<BinnedRow> {
        self.assign(readings).reduce()
    }
}
