//! Experimental phase tagging

use crate::config::PhaseInterval;
use crate::types::{MergedRow, PhaseLabel, TaggedRow};

/// Ordered phase table; the first interval containing a time wins
#[derive(Debug, Clone)]
pub struct PhaseTagger {
    phases: Vec<PhaseInterval>,
}

impl PhaseTagger {
    pub fn new(phases: Vec<PhaseInterval>) -> Self {
        Self { phases }
    }

    /// Label for a single elapsed time in milliseconds
    pub fn label(&self, elapsed_ms: i64) -> PhaseLabel {
        self.phases
            .iter()
            .find(|phase| phase.contains(elapsed_ms))
            .map(|phase| PhaseLabel::Named(phase.name.clone()))
            .unwrap_or(PhaseLabel::None)
    }

    pub fn tag(&self, rows: Vec<MergedRow>) -> Vec<TaggedRow> {
        rows.into_iter()
            .map(|row| TaggedRow {
                phase: self.label(row.elapsed_time),
                row,
            })
            .collect()
    }
}
