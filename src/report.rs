//! Run report
//!
//! Summarizes one pipeline run as JSON: producer metadata, stage counts and
//! the mean error of each sensor against the thermal reference.

use crate::error::AlignError;
use crate::postprocess::error_column;
use crate::stats;
use crate::table::DataTable;
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub run_id: String,
}

/// Row counts for one input stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCounts {
    /// Rows read from the CSV file
    pub readings: usize,
    /// Readings removed by outlier rules
    pub rejected: usize,
    /// Aggregated bins emitted
    pub bins: usize,
}

/// Row counts through every stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub diy: StreamCounts,
    pub bio: StreamCounts,
    pub merged_rows: usize,
    /// Merged rows per phase label, including "none"
    pub rows_per_phase: BTreeMap<String, usize>,
    /// Rows left after post-processing
    pub final_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub producer: Producer,
    pub participant_id: u32,
    pub computed_at_utc: String,
    pub counts: StageCounts,
    /// Mean of each sensor's error column, absent for an empty table
    pub mean_error: BTreeMap<String, Option<f64>>,
}

impl RunReport {
    pub fn new(participant_id: u32, counts: StageCounts, table: &DataTable, sensors: &[String]) -> Self {
        let mean_error = sensors
            .iter()
            .map(|sensor| {
                let mean = table.column(&error_column(sensor)).and_then(stats::mean);
                (sensor.clone(), mean)
            })
            .collect();

        Self {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                run_id: Uuid::new_v4().to_string(),
            },
            participant_id,
            computed_at_utc: Utc::now().to_rfc3339(),
            counts,
            mean_error,
        }
    }

    pub fn to_json(&self) -> Result<String, AlignError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
