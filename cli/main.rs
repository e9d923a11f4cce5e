#![deny(unused_variables)]

use brainage::config::AnalysisConfig;
use brainage::pipeline::run_analysis;
use brainage::progress::{AblationProgressObserver, AblationProgressStage};
use brainage::report::print_mae_table;
use brainage::{ModelKind, ScalerKind};
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(
    name = "brainage",
    about = "Brain-age prediction with leave-one-feature-group-out ablation",
    long_about = "Trains age regressors on imaging features of healthy controls, withholding one \
                 feature group at a time, and reports how much each group contributes to \
                 prediction accuracy in disease and control cohorts."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full ablation analysis described by a configuration file
    #[command(about = "Run the ablation analysis (outputs: mae_summary.tsv, predictions, plots)")]
    Run(RunArgs),

    /// Print the feature-group registry
    #[command(about = "List the feature groups and their columns")]
    Groups {
        /// Configuration whose group override should be listed instead of the defaults
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Write a default configuration file to start from
    #[command(about = "Write a template configuration (outputs: analysis.toml)")]
    Template {
        #[arg(value_name = "PATH", default_value = "analysis.toml")]
        path: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Path to the analysis configuration (.toml)
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Override the regression model: ridge or svr
    #[arg(long, value_name = "KIND", value_parser = parse_model_kind)]
    model: Option<ModelKind>,

    /// Override the feature scaler: min-max or standard
    #[arg(long, value_name = "KIND", value_parser = parse_scaler_kind)]
    scaler: Option<ScalerKind>,

    /// Override the output directory
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Skip rendering the scatter plots
    #[arg(long)]
    no_plots: bool,
}

fn parse_model_kind(value: &str) -> Result<ModelKind, String> {
    value.parse().map_err(|e: brainage::AblationError| e.to_string())
}

fn parse_scaler_kind(value: &str) -> Result<ScalerKind, String> {
    value.parse().map_err(|e: brainage::AblationError| e.to_string())
}

/// Terminal progress over feature groups.
struct GroupProgressBar {
    bar: ProgressBar,
}

impl GroupProgressBar {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} groups {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        Self { bar }
    }
}

impl AblationProgressObserver for GroupProgressBar {
    fn on_stage_start(&self, stage: AblationProgressStage, total_groups: usize) {
        self.bar.set_length(total_groups as u64);
        self.bar.set_message(stage.describe());
    }

    fn on_group_finish(&self, _stage: AblationProgressStage, group: &str) {
        self.bar.set_message(format!("(finished {group})"));
        self.bar.inc(1);
    }

    fn on_stage_finish(&self, _stage: AblationProgressStage) {
        self.bar.finish_and_clear();
    }
}

fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AnalysisConfig::load(&args.config)?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(scaler) = args.scaler {
        config.scaler = scaler;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if args.no_plots {
        config.plots = false;
    }

    log::info!(
        "Running {} / {} ablation from '{}'",
        config.model,
        config.scaler,
        args.config.display()
    );
    let progress = GroupProgressBar::new();
    let report = run_analysis(&config, &progress)?;

    print_mae_table(&report);
    println!(
        "Wrote {} files to '{}'",
        report.artifacts.len(),
        config.output_dir.display()
    );
    Ok(())
}

fn list_groups(config: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let groups = match config {
        Some(path) => AnalysisConfig::load(&path)?.feature_groups()?,
        None => AnalysisConfig::default().feature_groups()?,
    };
    for group in &groups {
        println!(
            "{} ({}): {} columns",
            group.name,
            group.display_label(),
            group.columns.len()
        );
        for column in &group.columns {
            println!("  {column}");
        }
    }
    Ok(())
}

fn write_template(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!("'{}' already exists; refusing to overwrite it", path.display()).into());
    }
    AnalysisConfig::default().save(&path)?;
    println!("Wrote template configuration to '{}'", path.display());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli { command } = Cli::parse();
    let result = match command {
        Some(Commands::Run(args)) => run(args),
        Some(Commands::Groups { config }) => list_groups(config),
        Some(Commands::Template { path }) => write_template(path),
        None => {
            let _ = Cli::command().print_help();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
