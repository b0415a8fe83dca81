//! Outlier rejection
//!
//! Stream-specific rules that drop implausible readings before aggregation:
//! - DIY: per-row saturation check across all channels
//! - Bio: per-bin low-tail rejection (`value <= mean - k*std`)
//! - Bio, optional: whole-stream previous-delta rule, off by default

use crate::binner::Bins;
use crate::stats;
use crate::types::Reading;
use log::debug;

/// Outlier filters for both streams
pub struct OutlierFilter;

impl OutlierFilter {
    /// Whether any channel of `reading` is strictly above `threshold`
    pub fn is_saturated(reading: &Reading, threshold: f64) -> bool {
        reading.values.iter().any(|v| *v > threshold)
    }

    /// Drop DIY readings with any saturated channel
    pub fn reject_saturated(readings: Vec<Reading>, threshold: f64) -> Vec<Reading> {
        readings
            .into_iter()
            .filter(|r| !Self::is_saturated(r, threshold))
            .collect()
    }

    /// Within each bin, drop readings whose `channel` value is at or below
    /// `mean - sigma * std` of that bin.
    ///
    /// A bin with zero spread keeps every reading. Returns the number of
    /// readings removed.
    pub fn reject_low_in_bins(bins: &mut Bins, channel: usize, sigma: f64) -> usize {
        let mut removed = 0;
        bins.for_each_bin_mut(|key, rows| {
            let values: Vec<f64> = rows.iter().map(|r| r.values[channel]).collect();
            let (Some(m), Some(s)) = (stats::mean(&values), stats::std_dev(&values)) else {
                return;
            };
            if s == 0.0 {
                return;
            }
            let floor = m - sigma * s;
            let before = rows.len();
            rows.retain(|r| r.values[channel] > floor);
            if rows.len() < before {
                debug!("bin {key}: dropped {} reading(s) at or below {floor}", before - rows.len());
                removed += before - rows.len();
            }
        });
        removed
    }

    /// Keep the first reading, then each reading whose `channel` value differs
    /// by less than `max_delta` from the last kept reading.
    pub fn reject_previous_delta(readings: Vec<Reading>, channel: usize, max_delta: f64) -> Vec<Reading> {
        let mut kept: Vec<Reading> = Vec::with_capacity(readings.len());
        for reading in readings {
            let accept = match kept.last() {
                None => true,
                Some(last) => (reading.values[channel] - last.values[channel]).abs() < max_delta,
            };
            if accept {
                kept.push(reading);
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binner::Binner;

    fn diy(t: i64, values: [f64; 6]) -> Reading {
        Reading::new(t, values.to_vec())
    }

    #[test]
    fn test_saturation_is_strict() {
        let at_limit = diy(0, [1000.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let above = diy(0, [0.0, 0.0, 0.0, 0.0, 0.0, 1001.0]);
        assert!(!OutlierFilter::is_saturated(&at_limit, 1000.0));
        assert!(OutlierFilter::is_saturated(&above, 1000.0));
    }

    #[test]
    fn test_saturated_row_changes_bin_mean() {
        let readings = vec![
            diy(10, [500.0, 1.0, 1.0, 1.0, 1.0, 1.0]),
            diy(20, [1500.0, 1.0, 1.0, 1.0, 1.0, 1.0]),
            diy(30, [700.0, 1.0, 1.0, 1.0, 1.0, 1.0]),
        ];
        let unfiltered = Binner::new(100).aggregate(readings.clone());
        let filtered = Binner::new(100).aggregate(OutlierFilter::reject_saturated(readings, 1000.0));

        assert_eq!(unfiltered[0].values[0], 900.0);
        assert_eq!(filtered[0].values[0], 600.0);
    }

    #[test]
    fn test_saturated_rows_never_reach_any_bin() {
        let readings: Vec<Reading> = (0..40)
            .map(|i| {
                let v = if i % 7 == 0 { 2000.0 } else { i as f64 };
                diy(i * 25, [1.0, 1.0, v, 1.0, 1.0, 1.0])
            })
            .collect();
        let bins = Binner::new(100).assign(OutlierFilter::reject_saturated(readings, 1000.0));
        for (_, rows) in bins.iter() {
            assert!(rows.iter().all(|r| r.values.iter().all(|v| *v <= 1000.0)));
        }
        assert_eq!(bins.reading_count(), 34);
    }

    #[test]
    fn test_low_tail_rejected_within_bin() {
        // Bin 0: nine readings at 1.0 and one dip at 0.0.
        let mut readings: Vec<Reading> = (0..9).map(|i| Reading::new(i * 10, vec![1.0])).collect();
        readings.push(Reading::new(95, vec![0.0]));
        readings.push(Reading::new(150, vec![5.0]));

        let mut bins = Binner::new(100).assign(readings);
        let removed = OutlierFilter::reject_low_in_bins(&mut bins, 0, 2.0);
        let rows = bins.reduce();

        assert_eq!(removed, 1);
        assert_eq!(rows[0].values, vec![1.0]);
        assert_eq!(rows[1].values, vec![5.0]);
    }

    #[test]
    fn test_single_reading_and_flat_bins_keep_everything() {
        let mut bins = Binner::new(100).assign(vec![
            Reading::new(0, vec![3.0]),
            Reading::new(100, vec![2.0]),
            Reading::new(120, vec![2.0]),
        ]);
        assert_eq!(OutlierFilter::reject_low_in_bins(&mut bins, 0, 2.0), 0);
        assert_eq!(bins.reduce().len(), 2);
    }

    #[test]
    fn test_previous_delta_compares_to_last_kept() {
        let readings = vec![
            Reading::new(0, vec![1.0]),
            Reading::new(10, vec![1.00001]),
            Reading::new(20, vec![1.5]),
            Reading::new(30, vec![1.00003]),
        ];
        let kept = OutlierFilter::reject_previous_delta(readings, 0, 0.00004);
        let times: Vec<i64> = kept.iter().map(|r| r.elapsed_time).collect();
        assert_eq!(times, vec![0, 10, 30]);
    }
}
