//! Core types for the breathsync pipeline
//!
//! This module defines the records that flow through each stage of the
//! pipeline: raw readings, elapsed-time readings, binned rows, merged rows
//! and phase-tagged rows.

use std::fmt;

/// Label written for rows that fall outside every configured phase
pub const NONE_PHASE: &str = "none";

/// Sensor stream identifier for logging and error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Multi-channel mechanical respiration sensors
    Diy,
    /// Thermal reference sensor
    Bio,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Diy => "diy",
            StreamKind::Bio => "bio",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamp as it appears in the source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTimestamp {
    /// Integer millisecond tick count (DIY stream `tod`)
    Ticks(i64),
    /// Clock string `h:m:s[.ms]` (bio stream `Elapsed Time`)
    Clock(String),
}

/// One sensor sample as read from disk
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    pub timestamp: RawTimestamp,
    /// Tracked channel values, in the order of the stream's channel list
    pub values: Vec<f64>,
    /// Pass-through text values, in the order of the stream's pass-through list
    pub labels: Vec<String>,
}

/// A reading placed on the stream's elapsed-time axis
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Milliseconds since the stream's origin
    pub elapsed_time: i64,
    pub values: Vec<f64>,
    pub labels: Vec<String>,
}

impl Reading {
    pub fn new(elapsed_time: i64, values: Vec<f64>) -> Self {
        Self {
            elapsed_time,
            values,
            labels: Vec::new(),
        }
    }
}

/// One aggregate row per occupied time bin
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedRow {
    /// Bin start (`key * bin_width`)
    pub elapsed_time: i64,
    /// Per-column mean over the bin's surviving readings
    pub values: Vec<f64>,
    /// Pass-through labels from the bin's first surviving reading
    pub labels: Vec<String>,
}

/// A DIY bin joined with the bio bin that starts at the same time
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub elapsed_time: i64,
    pub labels: Vec<String>,
    /// DIY channel means
    pub channels: Vec<f64>,
    /// Bio reference means
    pub reference: Vec<f64>,
}

/// Experimental phase assigned to a merged row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhaseLabel {
    Named(String),
    None,
}

impl PhaseLabel {
    pub fn parse(label: &str) -> Self {
        if label == NONE_PHASE {
            PhaseLabel::None
        } else {
            PhaseLabel::Named(label.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PhaseLabel::Named(name) => name,
            PhaseLabel::None => NONE_PHASE,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, PhaseLabel::None)
    }
}

impl fmt::Display for PhaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A merged row carrying its phase label
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedRow {
    pub row: MergedRow,
    pub phase: PhaseLabel,
}
