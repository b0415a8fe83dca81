//! Pipeline orchestration
//!
//! This module provides the public API for breathsync. It runs one
//! participant's two streams through every stage, from raw CSV rows to the
//! post-processed table.

use crate::adapters::{BioAdapter, DiyAdapter, StreamAdapter};
use crate::binner::Binner;
use crate::config::PipelineConfig;
use crate::error::AlignError;
use crate::export;
use crate::filter::OutlierFilter;
use crate::merger::merge_streams;
use crate::phases::PhaseTagger;
use crate::postprocess::PostProcessor;
use crate::report::{RunReport, StageCounts, StreamCounts};
use crate::table::DataTable;
use crate::timebase::TimeBase;
use crate::types::{BinnedRow, RawReading};
use log::{info, warn};
use std::io::Read;

/// Tagged merge output and the counts collected on the way
#[derive(Debug, Clone)]
pub struct Alignment {
    pub table: DataTable,
    pub counts: StageCounts,
}

/// Align one participant's files and write `pN_data.csv`.
///
/// Both inputs are fully read and validated before anything is written.
pub fn align_participant(config: &PipelineConfig) -> Result<Alignment, AlignError> {
    let pipeline = Pipeline::new(config.clone())?;
    let alignment = pipeline.align_files()?;
    pipeline.write_table(&alignment.table)?;
    Ok(alignment)
}

/// Align, post-process and write `pN_data.csv`, returning the run report
pub fn run_participant(config: &PipelineConfig) -> Result<RunReport, AlignError> {
    let pipeline = Pipeline::new(config.clone())?;
    let alignment = pipeline.align_files()?;
    let (table, report) = pipeline.finish(alignment)?;
    pipeline.write_table(&table)?;
    Ok(report)
}

/// Post-process an existing `pN_data.csv` in place
pub fn process_metrics(config: &PipelineConfig) -> Result<DataTable, AlignError> {
    let pipeline = Pipeline::new(config.clone())?;
    let path = config.paths().data;
    let table = export::read_table_file(&path, &config.diy.passthrough_columns)?;
    let table = pipeline.post_process(table)?;
    pipeline.write_table(&table)?;
    Ok(table)
}

/// Stage runner bound to one configuration
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline, validating the configuration
    pub fn new(config: PipelineConfig) -> Result<Self, AlignError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read both participant files and align them
    pub fn align_files(&self) -> Result<Alignment, AlignError> {
        let paths = self.config.paths();
        let diy = DiyAdapter::new(self.config.diy.clone()).read_file(&paths.diy)?;
        let bio = BioAdapter::new(&self.config.bio).read_file(&paths.bio)?;
        self.align(diy, bio)
    }

    /// Align two CSV sources
    pub fn align_readers(&self, diy: &mut dyn Read, bio: &mut dyn Read) -> Result<Alignment, AlignError> {
        let diy = DiyAdapter::new(self.config.diy.clone()).parse(diy)?;
        let bio = BioAdapter::new(&self.config.bio).parse(bio)?;
        self.align(diy, bio)
    }

    /// Time base, filter, bin, merge and tag
    ///
    /// Pipeline stages:
    /// 1. TimeBase - elapsed milliseconds per stream
    /// 2. OutlierFilter / Binner - cleaned per-bin means per stream
    /// 3. merge_streams - exact-key join, DIY as primary
    /// 4. PhaseTagger - phase label per merged row
    pub fn align(&self, diy: Vec<RawReading>, bio: Vec<RawReading>) -> Result<Alignment, AlignError> {
        let mut counts = StageCounts::default();

        let (diy_bins, diy_counts) = self.aggregate_diy(diy)?;
        counts.diy = diy_counts;
        let (bio_bins, bio_counts) = self.aggregate_bio(bio)?;
        counts.bio = bio_counts;

        let merged = merge_streams(&diy_bins, &bio_bins);
        counts.merged_rows = merged.len();
        if merged.is_empty() {
            warn!("no bins matched between the diy and bio streams");
        }
        info!(
            "merged {} of {} diy / {} bio bins",
            merged.len(),
            diy_bins.len(),
            bio_bins.len()
        );

        let tagged = PhaseTagger::new(self.config.phases.clone()).tag(merged);
        for row in &tagged {
            *counts
                .rows_per_phase
                .entry(row.phase.as_str().to_string())
                .or_insert(0) += 1;
        }

        let table = DataTable::from_tagged(
            &tagged,
            &self.config.diy.passthrough_columns,
            &self.config.diy.channels,
            std::slice::from_ref(&self.config.bio.reference_channel),
        );

        Ok(Alignment { table, counts })
    }

    fn aggregate_diy(&self, raw: Vec<RawReading>) -> Result<(Vec<BinnedRow>, StreamCounts), AlignError> {
        let readings = TimeBase::normalize(raw)?;
        let total = readings.len();

        let kept = OutlierFilter::reject_saturated(readings, self.config.diy.saturation_threshold);
        let rejected = total - kept.len();

        let bins = Binner::new(self.config.bin_width_ms).aggregate(kept);
        info!("diy: {total} readings, {rejected} saturated, {} bins", bins.len());

        let bin_count = bins.len();
        Ok((
            bins,
            StreamCounts {
                readings: total,
                rejected,
                bins: bin_count,
            },
        ))
    }

    fn aggregate_bio(&self, raw: Vec<RawReading>) -> Result<(Vec<BinnedRow>, StreamCounts), AlignError> {
        let readings = TimeBase::normalize(raw)?;
        let total = readings.len();
        let filter = &self.config.bio.filter;

        let readings = match filter.previous_delta {
            Some(max_delta) => OutlierFilter::reject_previous_delta(readings, 0, max_delta),
            None => readings,
        };
        let mut rejected = total - readings.len();

        let mut bins = Binner::new(self.config.bin_width_ms).assign(readings);
        if let Some(sigma) = filter.bin_sigma {
            rejected += OutlierFilter::reject_low_in_bins(&mut bins, 0, sigma);
        }

        let bins = bins.reduce();
        info!("bio: {total} readings, {rejected} rejected, {} bins", bins.len());

        let bin_count = bins.len();
        Ok((
            bins,
            StreamCounts {
                readings: total,
                rejected,
                bins: bin_count,
            },
        ))
    }

    /// Run the four post-processing passes
    pub fn post_process(&self, table: DataTable) -> Result<DataTable, AlignError> {
        PostProcessor::from_config(&self.config).process(table)
    }

    /// Post-process an alignment and build its report
    pub fn finish(&self, alignment: Alignment) -> Result<(DataTable, RunReport), AlignError> {
        let mut counts = alignment.counts;
        let table = self.post_process(alignment.table)?;
        counts.final_rows = table.len();
        let report = RunReport::new(self.config.participant_id, counts, &table, &self.config.sensors);
        Ok((table, report))
    }

    /// Write `table` to the participant's data file
    pub fn write_table(&self, table: &DataTable) -> Result<(), AlignError> {
        let path = self.config.paths().data;
        export::write_table_file(table, &path)?;
        info!("wrote {} row(s) to {}", table.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhaseInterval;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;

    const DIY_HEADER: &str =
        "participant,group,tod,flex_chest,flex_abdomen,cord_chest,cord_abdomen,fabric_chest,fabric_abdomen";

    fn diy_row(tod: i64, base: f64) -> String {
        format!(
            "1,A,{tod},{},{},{},{},{},{}",
            base,
            base + 1.0,
            base * 2.0,
            base + 3.0,
            900.0 - base,
            base / 2.0
        )
    }

    fn clock(ms: i64) -> String {
        format!("{}:{}:{}.{:03}", ms / 3_600_000, (ms / 60_000) % 60, (ms / 1000) % 60, ms % 1000)
    }

    fn write_inputs(dir: &Path, diy: &[String], bio: &[String]) {
        let participant = dir.join("p1");
        fs::create_dir_all(&participant).unwrap();
        let mut diy_csv = vec![DIY_HEADER.to_string()];
        diy_csv.extend(diy.iter().cloned());
        fs::write(participant.join("p1_diy.csv"), diy_csv.join("\n") + "\n").unwrap();
        let mut bio_csv = vec!["Elapsed Time,therm".to_string()];
        bio_csv.extend(bio.iter().cloned());
        fs::write(participant.join("p1_bio.csv"), bio_csv.join("\n") + "\n").unwrap();
    }

    fn ramp_inputs(dir: &Path) {
        // DIY every 50 ms from tick 10_000, bio every 25 ms, 1.5 s of data.
        let diy: Vec<String> = (0..30).map(|i| diy_row(10_000 + i * 50, 100.0 + (i % 7) as f64 * 10.0)).collect();
        let bio: Vec<String> = (0..60)
            .map(|i| format!("{},{}", clock(i * 25), 0.5 + i as f64 * 0.001))
            .collect();
        write_inputs(dir, &diy, &bio);
    }

    fn test_config(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            data_dir: dir.to_path_buf(),
            phases: vec![PhaseInterval::new("warmup", 0, 1)],
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_align_example_scenario() {
        let diy = [DIY_HEADER.to_string(), diy_row(1000, 1.0), diy_row(1050, 3.0), diy_row(1150, 5.0), diy_row(1250, 7.0)]
            .join("\n");
        let bio = "Elapsed Time,therm\n0:0:0.000,0.1\n0:0:0.100,0.2\n0:0:0.200,0.3\n0:0:0.300,0.4\n";

        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let alignment = pipeline.align_readers(&mut diy.as_bytes(), &mut bio.as_bytes()).unwrap();

        assert_eq!(alignment.table.elapsed_time, vec![0, 100, 200]);
        assert_eq!(alignment.table.column("flex_chest"), Some(&[2.0, 5.0, 7.0][..]));
        assert_eq!(alignment.table.column("therm"), Some(&[0.1, 0.2, 0.3][..]));
        assert_eq!(alignment.counts.diy.bins, 3);
        assert_eq!(alignment.counts.bio.bins, 4);
        assert_eq!(alignment.counts.merged_rows, 3);
        assert_eq!(alignment.counts.rows_per_phase.get("none"), Some(&3));
    }

    #[test]
    fn test_saturated_reading_excluded_from_alignment() {
        let diy = [DIY_HEADER.to_string(), diy_row(0, 10.0), "1,A,20,1500,1,1,1,1,1".to_string()].join("\n");
        let bio = "Elapsed Time,therm\n0:0:0,0.1\n";

        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let alignment = pipeline.align_readers(&mut diy.as_bytes(), &mut bio.as_bytes()).unwrap();

        assert_eq!(alignment.counts.diy.rejected, 1);
        assert_eq!(alignment.table.column("flex_chest"), Some(&[10.0][..]));
    }

    #[test]
    fn test_align_participant_writes_data_file() {
        let dir = tempfile::tempdir().unwrap();
        ramp_inputs(dir.path());
        let config = test_config(dir.path());

        let alignment = align_participant(&config).unwrap();
        assert_eq!(alignment.table.len(), 15);
        assert_eq!(alignment.counts.rows_per_phase.get("warmup"), Some(&10));
        assert_eq!(alignment.counts.bio.rejected, 0);

        let text = fs::read_to_string(config.paths().data).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("elapsed_time,phase,participant,group,flex_chest,flex_abdomen,cord_chest,cord_abdomen,fabric_chest,fabric_abdomen,therm")
        );
        assert_eq!(lines.count(), 15);
    }

    #[test]
    fn test_run_participant_post_processes() {
        let dir = tempfile::tempdir().unwrap();
        ramp_inputs(dir.path());
        let config = test_config(dir.path());

        let report = run_participant(&config).unwrap();
        assert_eq!(report.counts.final_rows, 10);
        assert!(report.mean_error["flex"].is_some());

        let table = export::read_table_file(&config.paths().data, &config.diy.passthrough_columns).unwrap();
        assert_eq!(table.len(), 10);
        assert!(table.phase.iter().all(|p| p.as_str() == "warmup"));
        for sensor in ["flex", "cord", "fabric"] {
            let errors = table.column(&format!("{sensor}_R")).unwrap();
            assert!(errors.iter().all(|e| (0.0..=1.0).contains(e)));
        }
    }

    #[test]
    fn test_metrics_pass_matches_single_run() {
        let dir = tempfile::tempdir().unwrap();
        ramp_inputs(dir.path());
        let config = test_config(dir.path());

        align_participant(&config).unwrap();
        let in_place = process_metrics(&config).unwrap();

        run_participant(&config).unwrap();
        let single = export::read_table_file(&config.paths().data, &config.diy.passthrough_columns).unwrap();

        assert_eq!(in_place.headers(), single.headers());
        assert_eq!(in_place.elapsed_time, single.elapsed_time);
    }

    #[test]
    fn test_malformed_timestamp_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), &[diy_row(0, 1.0)], &["00:00".to_string() + ",0.5"]);
        let config = test_config(dir.path());

        let err = run_participant(&config).unwrap_err();
        assert!(matches!(err, AlignError::Format { .. }));
        assert!(!config.paths().data.exists());
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = align_participant(&test_config(dir.path())).unwrap_err();
        assert!(matches!(err, AlignError::MissingFile { .. }));
    }

    #[test]
    fn test_empty_join_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), &[diy_row(0, 1.0), diy_row(250, 2.0)], &[format!("{},0.5", clock(120_000))]);
        let config = test_config(dir.path());

        let report = run_participant(&config).unwrap();
        assert_eq!(report.counts.merged_rows, 0);
        assert_eq!(report.counts.final_rows, 0);

        let text = fs::read_to_string(config.paths().data).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_previous_delta_rule_only_when_configured() {
        let diy = [DIY_HEADER.to_string(), diy_row(0, 1.0), diy_row(100, 2.0)].join("\n");
        let bio = "Elapsed Time,therm\n0:0:0.000,0.5\n0:0:0.100,0.9\n";

        let default_run = Pipeline::new(PipelineConfig::default())
            .unwrap()
            .align_readers(&mut diy.as_bytes(), &mut bio.as_bytes())
            .unwrap();
        assert_eq!(default_run.table.len(), 2);

        let mut config = PipelineConfig::default();
        config.bio.filter.previous_delta = Some(0.00004);
        let delta_run = Pipeline::new(config)
            .unwrap()
            .align_readers(&mut diy.as_bytes(), &mut bio.as_bytes())
            .unwrap();
        assert_eq!(delta_run.counts.bio.rejected, 1);
        assert_eq!(delta_run.table.elapsed_time, vec![0]);
    }
}
