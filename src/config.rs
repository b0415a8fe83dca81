//! Pipeline configuration
//!
//! Every tunable the stages consume (participant, bin width, column lists,
//! thresholds, phase table) lives in one serializable [`PipelineConfig`] that
//! is passed explicitly into the pipeline.

use crate::error::AlignError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default bin width in milliseconds
pub const DEFAULT_BIN_WIDTH_MS: i64 = 100;

/// Default DIY saturation threshold (raw ADC units)
pub const DEFAULT_SATURATION_THRESHOLD: f64 = 1000.0;

/// Default number of standard deviations below the bin mean that mark a bio outlier
pub const DEFAULT_BIN_SIGMA: f64 = 2.0;

/// Named experimental interval `[start_sec, end_sec)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseInterval {
    pub name: String,
    pub start_sec: i64,
    pub end_sec: i64,
}

impl PhaseInterval {
    pub fn new(name: &str, start_sec: i64, end_sec: i64) -> Self {
        Self {
            name: name.to_string(),
            start_sec,
            end_sec,
        }
    }

    /// Whether `elapsed_ms` lies in `[start_sec*1000, end_sec*1000)`
    pub fn contains(&self, elapsed_ms: i64) -> bool {
        elapsed_ms >= self.start_sec * 1000 && elapsed_ms < self.end_sec * 1000
    }
}

/// Column layout of the DIY stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiyStreamConfig {
    pub timestamp_column: String,
    pub channels: Vec<String>,
    /// Text columns copied through binning from the bin's first reading
    pub passthrough_columns: Vec<String>,
    /// A reading with any channel strictly above this value is discarded
    pub saturation_threshold: f64,
}

impl Default for DiyStreamConfig {
    fn default() -> Self {
        Self {
            timestamp_column: "tod".to_string(),
            channels: [
                "flex_chest",
                "flex_abdomen",
                "cord_chest",
                "cord_abdomen",
                "fabric_chest",
                "fabric_abdomen",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            passthrough_columns: vec!["participant".to_string(), "group".to_string()],
            saturation_threshold: DEFAULT_SATURATION_THRESHOLD,
        }
    }
}

/// Outlier rules applied to the bio stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BioFilterConfig {
    /// Per-bin rule: drop readings at or below `mean - bin_sigma * std`
    pub bin_sigma: Option<f64>,
    /// Whole-stream rule: keep a reading only if it moved less than this
    /// amount from the previous kept reading. Disabled unless set.
    pub previous_delta: Option<f64>,
}

impl Default for BioFilterConfig {
    fn default() -> Self {
        Self {
            bin_sigma: Some(DEFAULT_BIN_SIGMA),
            previous_delta: None,
        }
    }
}

/// Column layout of the bio stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BioStreamConfig {
    pub timestamp_column: String,
    pub reference_channel: String,
    pub filter: BioFilterConfig,
}

impl Default for BioStreamConfig {
    fn default() -> Self {
        Self {
            timestamp_column: "Elapsed Time".to_string(),
            reference_channel: "therm".to_string(),
            filter: BioFilterConfig::default(),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the `pN/` participant folders
    pub data_dir: PathBuf,
    pub participant_id: u32,
    pub bin_width_ms: i64,
    pub diy: DiyStreamConfig,
    pub bio: BioStreamConfig,
    /// Phases in match order; the first containing interval wins
    pub phases: Vec<PhaseInterval>,
    /// Sensor types whose site channels are named `<sensor>_<site>`
    pub sensors: Vec<String>,
    pub sites: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            participant_id: 1,
            bin_width_ms: DEFAULT_BIN_WIDTH_MS,
            diy: DiyStreamConfig::default(),
            bio: BioStreamConfig::default(),
            phases: vec![
                PhaseInterval::new("natural", 50, 110),
                PhaseInterval::new("deep", 210, 270),
                PhaseInterval::new("medium", 360, 420),
                PhaseInterval::new("shallow", 465, 525),
                PhaseInterval::new("elevated", 630, 770),
            ],
            sensors: vec!["flex".to_string(), "cord".to_string(), "fabric".to_string()],
            sites: vec!["chest".to_string(), "abdomen".to_string()],
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, AlignError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, AlignError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, AlignError> {
        let json = fs::read_to_string(path).map_err(|source| AlignError::MissingFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), AlignError> {
        if self.bin_width_ms <= 0 {
            return Err(AlignError::InvalidConfig(format!(
                "bin_width_ms must be positive, got {}",
                self.bin_width_ms
            )));
        }
        if self.diy.channels.is_empty() {
            return Err(AlignError::InvalidConfig(
                "diy.channels must not be empty".to_string(),
            ));
        }
        if self.sensors.is_empty() {
            return Err(AlignError::InvalidConfig(
                "sensors must not be empty".to_string(),
            ));
        }
        if self.sites.is_empty() {
            return Err(AlignError::InvalidConfig(
                "sites must not be empty".to_string(),
            ));
        }
        if self.bio.reference_channel.is_empty() {
            return Err(AlignError::InvalidConfig(
                "bio.reference_channel must not be empty".to_string(),
            ));
        }
        for phase in &self.phases {
            if phase.name.is_empty() || phase.name == crate::types::NONE_PHASE {
                return Err(AlignError::InvalidConfig(format!(
                    "invalid phase name {:?}",
                    phase.name
                )));
            }
            if phase.end_sec <= phase.start_sec {
                return Err(AlignError::InvalidConfig(format!(
                    "phase {:?} ends before it starts ({}..{})",
                    phase.name, phase.start_sec, phase.end_sec
                )));
            }
        }
        for sensor in &self.sensors {
            for site in &self.sites {
                let channel = site_channel(sensor, site);
                if !self.diy.channels.contains(&channel) {
                    return Err(AlignError::InvalidConfig(format!(
                        "sensor channel {channel:?} is not a DIY channel"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn paths(&self) -> ParticipantPaths {
        ParticipantPaths::new(&self.data_dir, self.participant_id)
    }
}

/// Column name for one sensor at one body site
pub fn site_channel(sensor: &str, site: &str) -> String {
    format!("{sensor}_{site}")
}

/// File locations for one participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantPaths {
    pub diy: PathBuf,
    pub bio: PathBuf,
    pub data: PathBuf,
}

impl ParticipantPaths {
    pub fn new(data_dir: &Path, participant_id: u32) -> Self {
        let dir = data_dir.join(format!("p{participant_id}"));
        Self {
            diy: dir.join(format!("p{participant_id}_diy.csv")),
            bio: dir.join(format!("p{participant_id}_bio.csv")),
            data: dir.join(format!("p{participant_id}_data.csv")),
        }
    }
}
