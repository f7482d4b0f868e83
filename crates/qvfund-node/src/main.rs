//! QVFund runner.
//!
//! Loads a ledger configuration, replays an operation script against a
//! fresh voting engine and prints the resulting report as JSON.

pub mod config;
pub mod script;
pub mod telemetry;

use clap::{Parser, Subcommand};
use qvfund_governance::VotingEngine;
use std::path::PathBuf;
use tracing::{error, info};

use crate::config::{LogFormat, NodeConfig};
use crate::script::Script;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "qvfund")]
#[command(about = "QVFund - quadratic voting and funding ledger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay an operation script against a new engine
    Run {
        /// Config file path
        #[arg(short, long, value_name = "FILE", env = "QVFUND_CONFIG")]
        config: Option<PathBuf>,

        /// Script file path (JSON)
        #[arg(short, long, value_name = "FILE")]
        script: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Log level, overrides the config
        #[arg(short, long)]
        log_level: Option<String>,

        /// Emit JSON logs
        #[arg(long)]
        json_logs: bool,

        /// Exit with an error if any step was rejected
        #[arg(long)]
        strict: bool,
    },
    /// Write a default config file
    InitConfig {
        /// Destination file
        file: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Run {
            config,
            script,
            output,
            log_level,
            json_logs,
            strict,
        } => run(config, script, output, log_level, json_logs, strict),
        Command::InitConfig { file, force } => init_config(file, force),
    }
}

fn run(
    config_path: Option<PathBuf>,
    script_path: PathBuf,
    output: Option<PathBuf>,
    log_level: Option<String>,
    json_logs: bool,
    strict: bool,
) -> anyhow::Result<()> {
    let mut config = match &config_path {
        Some(path) => NodeConfig::from_file(path)?,
        None => NodeConfig::default(),
    };

    // Override with CLI args
    if let Some(level) = log_level {
        config.logging.level = level;
    }
    if json_logs {
        config.logging.format = LogFormat::Json;
    }
    config.validate()?;

    telemetry::init_from_config(&config.logging)?;

    match &config_path {
        Some(path) => info!("Loaded configuration from: {:?}", path),
        None => info!("Using default configuration"),
    }
    info!("Configuration:");
    info!("  Name: {}", config.name);
    info!("  Credit price: {}", qvfund_types::format_currency(config.ledger.credit_price));
    info!("  Max credits: {}", config.ledger.max_credits);
    info!("  Owner: {}", config.ledger.owner);

    let engine = VotingEngine::new(config.ledger.clone())?;
    let script = Script::from_file(&script_path)?;
    info!("Replaying {} steps from {:?}", script.steps.len(), script_path);

    let report = script::run_script(&config.name, &engine, &script);
    let rendered = serde_json::to_string_pretty(&report)?;

    match output {
        Some(path) => {
            config::check_path(&path)?;
            std::fs::write(&path, rendered)
                .map_err(|e| anyhow::anyhow!("Failed to write report '{}': {}", path.display(), e))?;
            info!("Report written to {:?}", path);
        }
        None => println!("{}", rendered),
    }

    let failed = report.failed_steps();
    if strict && failed > 0 {
        error!("{} of {} steps were rejected", failed, report.steps.len());
        anyhow::bail!("{} steps rejected", failed);
    }
    Ok(())
}

fn init_config(file: PathBuf, force: bool) -> anyhow::Result<()> {
    if file.exists() && !force {
        anyhow::bail!("'{}' already exists, pass --force to overwrite", file.display());
    }
    NodeConfig::default().to_file(&file)?;
    println!("Wrote default configuration to {}", file.display());
    Ok(())
}
