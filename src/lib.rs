//! breathsync - Alignment and scoring of breathing-experiment sensor streams
//!
//! breathsync aligns a high-rate DIY respiration sensor stream with a thermal
//! reference stream recorded on a separate clock, through a deterministic
//! pipeline: stream adaptation → time base normalization → outlier rejection
//! → binning → merge → phase tagging → post-processing.
//!
//! ## Modules
//!
//! - **Alignment**: `adapters`, `timebase`, `filter`, `binner`, `merger`, `phases`
//! - **Scoring**: `postprocess` normalizes each channel and scores it against the reference
//! - **Output**: `table`, `export`, `report`

pub mod adapters;
pub mod binner;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod merger;
pub mod phases;
pub mod pipeline;
pub mod postprocess;
pub mod report;
pub mod stats;
pub mod table;
pub mod timebase;
pub mod types;

pub use config::{PhaseInterval, PipelineConfig};
pub use error::AlignError;
pub use pipeline::{align_participant, process_metrics, run_participant, Pipeline};
pub use table::DataTable;

/// Crate version embedded in run reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for run reports
pub const PRODUCER_NAME: &str = "breathsync";
