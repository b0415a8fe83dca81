//! Post-processing of the tagged table
//!
//! Four passes, each finishing over the whole table before the next begins:
//! 1. drop rows outside every phase
//! 2. min-max normalize each `<sensor>_<site>` channel and the reference
//! 3. average each sensor's site columns into `<sensor>_norm`
//! 4. absolute error `<sensor>_R` against the normalized reference
//!
//! Normalization requires every channel to vary over the remaining rows; a
//! constant channel fails with [`AlignError::DegenerateChannel`].

use crate::config::{site_channel, PipelineConfig};
use crate::error::AlignError;
use crate::stats;
use crate::table::DataTable;
use log::info;

/// Name of the normalized counterpart of `column`
pub fn norm_column(column: &str) -> String {
    format!("{column}_norm")
}

/// Name of a sensor's error column
pub fn error_column(sensor: &str) -> String {
    format!("{sensor}_R")
}

/// Post-processor over a tagged [`DataTable`]
#[derive(Debug, Clone)]
pub struct PostProcessor {
    sensors: Vec<String>,
    sites: Vec<String>,
    reference: String,
}

impl PostProcessor {
    pub fn new(sensors: Vec<String>, sites: Vec<String>, reference: String) -> Self {
        Self {
            sensors,
            sites,
            reference,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.sensors.clone(),
            config.sites.clone(),
            config.bio.reference_channel.clone(),
        )
    }

    /// Run all four passes in order
    pub fn process(&self, mut table: DataTable) -> Result<DataTable, AlignError> {
        let dropped = self.remove_none_phases(&mut table);
        info!("post-process: dropped {dropped} untagged row(s), {} remain", table.len());
        self.normalize(&mut table)?;
        self.pair_average(&mut table)?;
        self.compute_error(&mut table)?;
        Ok(table)
    }

    /// Pass 1. Returns the number of rows removed.
    pub fn remove_none_phases(&self, table: &mut DataTable) -> usize {
        let before = table.len();
        let phases = table.phase.clone();
        table.retain_rows(|i| !phases[i].is_none());
        before - table.len()
    }

    /// Pass 2
    pub fn normalize(&self, table: &mut DataTable) -> Result<(), AlignError> {
        let mut channels: Vec<String> = Vec::new();
        for sensor in &self.sensors {
            for site in &self.sites {
                channels.push(site_channel(sensor, site));
            }
        }
        channels.push(self.reference.clone());

        for channel in &channels {
            let scaled = stats::min_max_scale(table.require(channel)?)
                .ok_or_else(|| AlignError::DegenerateChannel(channel.clone()))?;
            table.set_column(&norm_column(channel), scaled);
        }
        Ok(())
    }

    /// Pass 3
    pub fn pair_average(&self, table: &mut DataTable) -> Result<(), AlignError> {
        if self.sites.is_empty() {
            return Err(AlignError::InvalidConfig("no body sites to average".to_string()));
        }
        for sensor in &self.sensors {
            let site_columns = self
                .sites
                .iter()
                .map(|site| table.require(&norm_column(&site_channel(sensor, site))))
                .collect::<Result<Vec<_>, _>>()?;

            let averaged: Vec<f64> = (0..table.len())
                .map(|row| site_columns.iter().map(|c| c[row]).sum::<f64>() / site_columns.len() as f64)
                .collect();
            table.set_column(&norm_column(sensor), averaged);
        }
        Ok(())
    }

    /// Pass 4
    pub fn compute_error(&self, table: &mut DataTable) -> Result<(), AlignError> {
        let reference = table.require(&norm_column(&self.reference))?.to_vec();
        for sensor in &self.sensors {
            let errors: Vec<f64> = table
                .require(&norm_column(sensor))?
                .iter()
                .zip(&reference)
                .map(|(value, reference)| (value - reference).abs())
                .collect();
            table.set_column(&error_column(sensor), errors);
        }
        Ok(())
    }
}
