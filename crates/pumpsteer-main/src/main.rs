// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of PumpSteer.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! PumpSteer command-line entry point.
//!
//! Each `evaluate` run is one engine cycle: load state, decide, print the
//! output as JSON and persist the updated state.

mod config;
mod export;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pumpsteer_core::{Engine, StatePersistence};
use pumpsteer_types::{CycleInput, CycleStatus};
use std::io::Read;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::config::{AppConfig, ConfigSource};

#[derive(Parser)]
#[command(name = "pumpsteer")]
#[command(about = "Virtual outdoor temperature engine for heat pump control", long_about = None)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Engine state file, overrides the configured path
    #[arg(short, long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one decision cycle and print the output as JSON
    Evaluate(EvaluateArgs),

    /// Show learned inertia, session statistics and recommendations
    Insights,

    /// Check the configuration and report every issue found
    ValidateConfig,

    /// Export recorded heating sessions as CSV
    ExportSessions(ExportArgs),
}

#[derive(clap::Args)]
struct EvaluateArgs {
    /// Cycle input JSON file, `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Do not write the updated state back
    #[arg(long)]
    no_save: bool,
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Output CSV file, stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut app, source) = AppConfig::load(cli.config.as_deref())?;
    if let Some(state) = cli.state {
        app.state_path = state;
    }

    init_tracing(&app.log_level)?;
    match &source {
        ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
        ConfigSource::Defaults => {
            warn!("No configuration file found, using defaults with environment overrides");
        }
    }

    // validate-config reports every issue itself
    if !matches!(cli.command, Commands::ValidateConfig) {
        app.validate()?;
    }

    match cli.command {
        Commands::Evaluate(args) => evaluate_command(&app, &args),
        Commands::Insights => insights_command(&app),
        Commands::ValidateConfig => validate_config_command(&app),
        Commands::ExportSessions(args) => export_command(&app, &args),
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let default_level = if log_level.trim().is_empty() {
        "info"
    } else {
        log_level
    };

    // Logs go to stderr so stdout stays machine-readable
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn read_input(source: &str) -> Result<CycleInput> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read cycle input from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read cycle input from {source}"))?
    };

    serde_json::from_str(&raw).context("Failed to parse cycle input")
}

fn evaluate_command(app: &AppConfig, args: &EvaluateArgs) -> Result<()> {
    let input = read_input(&args.input)?;
    let persistence = StatePersistence::new(&app.state_path);
    let loaded = persistence.load();

    let engine = Engine::new(app.engine.clone());
    let mut outcome = engine.run_cycle(&input, loaded.state);

    if let Some(diagnostic) = loaded.diagnostic {
        outcome.output.diagnostics.push(diagnostic);
    }
    if outcome.output.status == CycleStatus::Degraded {
        warn!("Cycle degraded: {}", outcome.output.decision_reason);
    }

    let json = serde_json::to_string_pretty(&outcome.output)
        .context("Failed to serialize cycle output")?;
    println!("{json}");

    if args.no_save {
        info!("State not saved (--no-save)");
    } else {
        persistence.save(&outcome.state)?;
    }
    Ok(())
}

fn insights_command(app: &AppConfig) -> Result<()> {
    let loaded = StatePersistence::new(&app.state_path).load();
    if let Some(diagnostic) = &loaded.diagnostic {
        warn!("State was reset: {diagnostic:?}");
    }

    let engine = Engine::new(app.engine.clone());
    let insights = engine.insights(&loaded.state);
    let json =
        serde_json::to_string_pretty(&insights).context("Failed to serialize insights")?;
    println!("{json}");
    Ok(())
}

fn validate_config_command(app: &AppConfig) -> Result<()> {
    let result = app.validate_detailed();

    for issue in &result.errors {
        println!("error   {issue}");
    }
    for issue in &result.warnings {
        println!("warning {issue}");
    }

    if result.has_errors() {
        anyhow::bail!("Configuration has {} error(s)", result.errors.len());
    }
    println!("Configuration OK ({} warning(s))", result.warnings.len());
    Ok(())
}

fn export_command(app: &AppConfig, args: &ExportArgs) -> Result<()> {
    let loaded = StatePersistence::new(&app.state_path).load();
    let sessions = &loaded.state.sessions;

    let rows = match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            export::write_sessions(sessions, file)?
        }
        None => export::write_sessions(sessions, std::io::stdout().lock())?,
    };

    info!("Exported {rows} session(s)");
    Ok(())
}
