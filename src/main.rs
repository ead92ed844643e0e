//! `vf-dataset` command-line entry point.
//!
//! # Subcommands
//!
//! - `stats`: per-rhythm window counts for the selected databases.
//! - `features`: build (or load) the feature matrix and label vector.
//!
//! Settings come from `settings.toml` (or `--config`); flags override them.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use vf_dataset::config::DatasetConfig;
use vf_dataset::dataset::{write_summary_csv, DatasetBuilder};
use vf_dataset::report::RhythmStatistics;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("vf-dataset error: {err:?}");
            ExitCode::from(1)
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "vf-dataset", version, about = "Labelled ECG windows for VF/VT detection")]
struct Cli {
    /// Settings file (default: platform config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding one sub-directory per database.
    #[arg(long, global = true)]
    database_root: Option<PathBuf>,
    /// Directory for segment and feature caches.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    /// Neither read nor write caches.
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the number of windows and records per rhythm.
    Stats(DatasetArgs),
    /// Extract features for every window.
    Features(FeaturesArgs),
}

#[derive(Args, Debug, Clone)]
struct DatasetArgs {
    /// Databases to include (default: from settings).
    #[arg(short = 'd', long, num_args = 1..)]
    db_names: Vec<String>,
    /// Window duration in seconds [default: 8].
    #[arg(short = 's', long)]
    segment_duration: Option<f64>,
    /// Override incorrect rhythm labels of the original annotations.
    #[arg(short = 'c', long)]
    correction_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct FeaturesArgs {
    #[command(flatten)]
    dataset: DatasetArgs,
    /// Worker threads for feature extraction.
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
    /// Write per-record window counts to this CSV file.
    #[arg(long)]
    summary: Option<PathBuf>,
}

impl Cli {
    fn execute(self) -> Result<()> {
        let mut config = match &self.config {
            Some(path) => DatasetConfig::load_from(path),
            None => DatasetConfig::load(),
        }
        .context("loading configuration")?;

        if let Some(root) = &self.database_root {
            config.dataset.database_root = root.clone();
        }
        if let Some(dir) = &self.cache_dir {
            config.dataset.cache_dir = dir.clone();
        }
        if self.no_cache {
            config.dataset.use_cache = false;
        }

        match self.command {
            Command::Stats(args) => {
                args.apply(&mut config);
                stats_command(&config)
            }
            Command::Features(args) => {
                args.dataset.apply(&mut config);
                if let Some(jobs) = args.jobs {
                    config.features.jobs = jobs;
                }
                features_command(&config, args.summary)
            }
        }
    }
}

impl DatasetArgs {
    fn apply(&self, config: &mut DatasetConfig) {
        if !self.db_names.is_empty() {
            config.dataset.databases = self.db_names.clone();
        }
        if let Some(secs) = self.segment_duration {
            config.segmentation.window_secs = secs;
        }
        if let Some(path) = &self.correction_file {
            config.dataset.correction_file = Some(path.clone());
        }
    }
}

fn stats_command(config: &DatasetConfig) -> Result<()> {
    let builder = DatasetBuilder::from_config(config).context("preparing dataset builder")?;
    let dataset = builder
        .load_segments(&config.dataset.databases, config.segmentation.window_secs)
        .context("building segments")?;

    let table = RhythmStatistics::from_windows(&dataset.windows).to_string();
    print!("{table}");
    Ok(())
}

fn features_command(config: &DatasetConfig, summary: Option<PathBuf>) -> Result<()> {
    let builder = DatasetBuilder::from_config(config).context("preparing dataset builder")?;
    let databases = &config.dataset.databases;
    let window_secs = config.segmentation.window_secs;

    let features = match summary {
        Some(path) => {
            let dataset = builder
                .load_segments(databases, window_secs)
                .context("building segments")?;
            write_summary_csv(&path, &dataset.records)
                .with_context(|| format!("writing {}", path.display()))?;
            builder.load_features_from(&dataset, databases)
        }
        None => builder.load_features(databases, window_secs),
    }
    .context("extracting features")?;

    let (rows, columns) = features.shape();
    let report = format!(
        "features: {rows} x {columns} ({})\nlabels: {} positive, {} negative\n",
        features.extractor,
        features.n_positive(),
        rows - features.n_positive()
    );
    print!("{report}");
    Ok(())
}
