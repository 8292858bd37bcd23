mod commands;
mod logging;
mod progress;

use std::path::Path;
use std::process;

use anyhow::Context;
use clap::Parser;
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use split_grade_core::config::{self, AppConfig};
use split_grade_core::SplitEngine;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let args = Cli::parse();

    let _guard = match logging::init_logger(args.verbose) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("{} cannot open the log file: {}", "Fatal:".red(), err);
            process::exit(1);
        }
    };

    let Some(config_path) = config::find_configuration(&args.config) else {
        if let Err(err) = create_default_config(&args.config) {
            error!("{} {:#}", "Fatal:".red(), err);
            process::exit(1);
        }
        return;
    };
    if config_path != args.config {
        info!("Reading configuration from {}", config_path.display());
    }

    let config = match config::load_configuration(&config_path) {
        Ok(config) => config,
        Err(err) => {
            error!(
                "{} error loading {}: {}",
                "Fatal:".red(),
                config_path.display(),
                err
            );
            process::exit(1);
        }
    };

    let result = match args.command {
        None | Some(Commands::Run) => run_split(&config),
        Some(Commands::PrintConfig) => print_config(&config),
    };

    if let Err(err) = result {
        error!("{} {:#}", "Fatal:".red(), err);
        process::exit(1);
    }
}

fn create_default_config(path: &Path) -> anyhow::Result<()> {
    config::write_default_configuration(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    info!(
        "{} created. Modify it and run again.",
        path.display().to_string().green()
    );
    Ok(())
}

fn run_split(config: &AppConfig) -> anyhow::Result<()> {
    let engine = SplitEngine::new(config.clone());
    let reporter = CliReporter::new();
    let report = engine.run(&reporter)?;

    info!(
        "Parse: {}, Split: {}",
        format!("{:.2}s", report.parse_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.extraction_duration.as_secs_f64()).green(),
    );
    info!(
        "{} groups, {} students, {} feedback files written",
        format!("{}", report.groups).cyan(),
        format!("{}", report.students).cyan(),
        format!("{}", report.documents_written).cyan(),
    );

    for warning in report.warnings() {
        warn!("{} {}", "Warning:".yellow(), warning);
    }

    Ok(())
}

fn print_config(config: &AppConfig) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(config).context("cannot render configuration")?;
    println!("{}", rendered);
    Ok(())
}
