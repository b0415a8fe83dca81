//! breathsync CLI - Command-line interface for breathsync
//!
//! Commands:
//! - align: Align one participant's streams into pN_data.csv
//! - metrics: Post-process an existing pN_data.csv in place
//! - run: Align and post-process in one pass
//! - doctor: Check configuration and input files
//! - config: Print the default configuration

use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use breathsync::adapters::{BioAdapter, DiyAdapter, StreamAdapter};
use breathsync::config::PipelineConfig;
use breathsync::pipeline::{align_participant, process_metrics, Pipeline};
use breathsync::{AlignError, PRODUCER_NAME, VERSION};

/// breathsync - Align DIY respiration sensors with a thermal reference
#[derive(Parser)]
#[command(name = "breathsync")]
#[command(version = VERSION)]
#[command(about = "Align and score breathing-experiment sensor streams", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every pipeline command
#[derive(clap::Args)]
struct RunArgs {
    /// Participant number (selects pN/pN_*.csv)
    #[arg(short, long)]
    participant: Option<u32>,

    /// Directory containing the pN/ folders
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Align both streams and write pN_data.csv
    Align {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Filter, normalize and score an existing pN_data.csv in place
    Metrics {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Align and post-process in one pass
    Run {
        #[command(flatten)]
        args: RunArgs,

        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Check configuration and input files
    Doctor {
        #[command(flatten)]
        args: RunArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as JSON
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BreathSyncCliError> {
    match cli.command {
        Commands::Align { args } => {
            let config = resolve_config(&args)?;
            let alignment = align_participant(&config)?;
            println!(
                "Aligned participant {}: {} rows -> {}",
                config.participant_id,
                alignment.table.len(),
                config.paths().data.display()
            );
            Ok(())
        }

        Commands::Metrics { args } => {
            let config = resolve_config(&args)?;
            let table = process_metrics(&config)?;
            println!(
                "Scored participant {}: {} rows -> {}",
                config.participant_id,
                table.len(),
                config.paths().data.display()
            );
            Ok(())
        }

        Commands::Run { args, report } => cmd_run(&args, report.as_deref()),

        Commands::Doctor { args, json } => cmd_doctor(&args, json),

        Commands::Config => {
            println!("{}", PipelineConfig::default().to_json()?);
            Ok(())
        }
    }
}

/// Load the configuration file (or defaults) and apply flag overrides
fn resolve_config(args: &RunArgs) -> Result<PipelineConfig, BreathSyncCliError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(participant) = args.participant {
        config.participant_id = participant;
    }
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    Ok(config)
}

fn cmd_run(args: &RunArgs, report_path: Option<&Path>) -> Result<(), BreathSyncCliError> {
    let config = resolve_config(args)?;
    let pipeline = Pipeline::new(config)?;

    let alignment = pipeline.align_files()?;
    let (table, report) = pipeline.finish(alignment)?;
    pipeline.write_table(&table)?;

    if let Some(path) = report_path {
        fs::write(path, report.to_json()?)?;
    }

    let config = pipeline.config();
    println!(
        "Participant {}: {} merged rows, {} in phase -> {}",
        config.participant_id,
        report.counts.merged_rows,
        report.counts.final_rows,
        config.paths().data.display()
    );
    for (sensor, error) in &report.mean_error {
        match error {
            Some(e) => println!("  {sensor:<8} mean error {e:.4}"),
            None => println!("  {sensor:<8} mean error n/a"),
        }
    }

    Ok(())
}

fn cmd_doctor(args: &RunArgs, json: bool) -> Result<(), BreathSyncCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    let config = match resolve_config(args) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: "parsed and validated".to_string(),
            });
            Some(config)
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: CliError::from(e).message,
            });
            None
        }
    };

    if let Some(config) = &config {
        let paths = config.paths();
        let diy = DiyAdapter::new(config.diy.clone());
        let bio = BioAdapter::new(&config.bio);
        checks.push(header_check("diy", &diy, &paths.diy));
        checks.push(header_check("bio", &bio, &paths.bio));

        checks.push(if paths.data.exists() {
            DoctorCheck {
                name: "data".to_string(),
                status: CheckStatus::Warning,
                message: format!("{} already present, align replaces it", paths.data.display()),
            }
        } else {
            DoctorCheck {
                name: "data".to_string(),
                status: CheckStatus::Ok,
                message: format!("align writes {}", paths.data.display()),
            }
        });
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        participant_id: config.as_ref().map(|c| c.participant_id),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let participant = report
            .participant_id
            .map_or_else(|| "unresolved".to_string(), |id| format!("p{id}"));
        println!("{} doctor, {participant}, v{}", report.producer, report.version);
        for check in &report.checks {
            let status = match check.status {
                CheckStatus::Ok => "ok",
                CheckStatus::Warning => "warn",
                CheckStatus::Error => "fail",
            };
            println!("{status:<5}{:<7}{}", check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(BreathSyncCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn header_check(name: &str, adapter: &dyn StreamAdapter, path: &Path) -> DoctorCheck {
    match adapter.check_header(path) {
        Ok(()) => DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: format!("header complete in {}", path.display()),
        },
        Err(e) => DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    }
}

// Error handling

#[derive(Debug)]
enum BreathSyncCliError {
    Io(std::io::Error),
    Pipeline(AlignError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<std::io::Error> for BreathSyncCliError {
    fn from(e: std::io::Error) -> Self {
        BreathSyncCliError::Io(e)
    }
}

impl From<AlignError> for BreathSyncCliError {
    fn from(e: AlignError) -> Self {
        BreathSyncCliError::Pipeline(e)
    }
}

impl From<serde_json::Error> for BreathSyncCliError {
    fn from(e: serde_json::Error) -> Self {
        BreathSyncCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BreathSyncCliError> for CliError {
    fn from(e: BreathSyncCliError) -> Self {
        match e {
            BreathSyncCliError::Io(e) => CliError {
                code: "io".to_string(),
                message: e.to_string(),
                hint: None,
            },
            BreathSyncCliError::Pipeline(e) => {
                let (code, hint) = match &e {
                    AlignError::Format { .. } => ("format", Some("DIY tod must be an integer tick; bio Elapsed Time is h:m:s[.ms]")),
                    AlignError::MissingFile { .. } => ("missing-file", Some("inputs are read from <data-dir>/p<N>/p<N>_diy.csv and p<N>_bio.csv")),
                    AlignError::MissingColumn { .. } => ("missing-column", Some("`breathsync doctor` lists the header of each stream")),
                    AlignError::InvalidValue { .. } => ("invalid-value", None),
                    AlignError::DegenerateChannel(_) => (
                        "degenerate-channel",
                        Some("a channel held one value across all phased rows"),
                    ),
                    AlignError::InvalidConfig(_) => ("invalid-config", Some("`breathsync config` prints the defaults")),
                    AlignError::Csv(_) => ("csv", None),
                    AlignError::Io(_) => ("io", None),
                    AlignError::Json(_) => ("config-json", None),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
            BreathSyncCliError::Json(e) => CliError {
                code: "json".to_string(),
                message: e.to_string(),
                hint: None,
            },
            BreathSyncCliError::DoctorFailed => CliError {
                code: "doctor".to_string(),
                message: "participant inputs are not ready to align".to_string(),
                hint: None,
            },
        }
    }
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    participant_id: Option<u32>,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_errors_carry_own_codes() {
        let err = CliError::from(BreathSyncCliError::Pipeline(AlignError::DegenerateChannel(
            "therm".to_string(),
        )));
        assert_eq!(err.code, "degenerate-channel");
        assert!(err.message.contains("therm"));
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_failed_doctor_reports_readiness() {
        let err = CliError::from(BreathSyncCliError::DoctorFailed);
        assert_eq!(err.code, "doctor");
        assert_eq!(err.message, "participant inputs are not ready to align");
        assert_eq!(err.hint, None);
    }
}
