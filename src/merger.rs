//! Stream merging
//!
//! Exact-key two-pointer join of the aggregated DIY and bio streams. Both
//! inputs must be ascending and free of duplicate bin times; only bins present
//! in both streams produce output.

use crate::types::{BinnedRow, MergedRow};

/// Join `primary` (DIY) and `secondary` (bio) bins on equal `elapsed_time`.
///
/// Each emitted row carries the primary row's labels and values followed by
/// the secondary row's values. Bins present in only one stream are dropped.
pub fn merge_streams(primary: &[BinnedRow], secondary: &[BinnedRow]) -> Vec<MergedRow> {
    let mut merged = Vec::with_capacity(primary.len().min(secondary.len()));
    let mut i = 0;
    let mut j = 0;

    while i < primary.len() && j < secondary.len() {
        while i < primary.len() && primary[i].elapsed_time < secondary[j].elapsed_time {
            i += 1;
        }
        if i >= primary.len() {
            break;
        }

        while j < secondary.len() && secondary[j].elapsed_time < primary[i].elapsed_time {
            j += 1;
        }
        if j >= secondary.len() {
            break;
        }

        // After both advances secondary[j] >= primary[i]; when they still
        // differ the next pass moves `i` forward.
        if primary[i].elapsed_time == secondary[j].elapsed_time {
            merged.push(MergedRow {
                elapsed_time: primary[i].elapsed_time,
                labels: primary[i].labels.clone(),
                channels: primary[i].values.clone(),
                reference: secondary[j].values.clone(),
            });
            i += 1;
            j += 1;
        }
    }

    merged
}
