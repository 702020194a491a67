//! Binary entry point for dyclee.
//!
//! This binary provides the CLI interface for the dyclee clustering engine.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use dyclee::cli::{ConfigCommand, RunCommand};
use dyclee::observability::{self, ObservabilityConfig};
use dyclee::{ConnectivityStrategy, DycleeConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Dyclee - dynamic density-based clustering of data streams.
#[derive(Parser)]
#[command(name = "dyclee")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "DYCLEE_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Cluster a dataset.
    Run {
        /// Input dataset (.csv or .ndjson/.jsonl).
        #[arg(short, long)]
        input: PathBuf,

        /// Write per-row labels here (.csv or .jsonl).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the snapshot history here as JSON.
        #[arg(long)]
        snapshots: Option<PathBuf>,

        /// Write Prometheus metrics here after the run.
        #[arg(long)]
        metrics_out: Option<PathBuf>,

        /// Override the relative hyperbox size.
        #[arg(long)]
        phi: Option<f64>,

        /// Override the connectivity strategy (exhaustive or indexed).
        #[arg(long)]
        connectivity: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Show the effective configuration.
        #[arg(long)]
        show: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "dyclee", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = load_config(cli.config.as_ref())?;

    let mut observability_config =
        ObservabilityConfig::from_settings(&config.observability, cli.verbose);
    if let Commands::Run {
        metrics_out: Some(_),
        ..
    } = &cli.command
    {
        observability_config.metrics.enabled = true;
    }
    let observability = observability::init(observability_config)
        .context("failed to initialize observability")?;

    match cli.command {
        Commands::Run {
            input,
            output,
            snapshots,
            metrics_out,
            phi,
            connectivity,
        } => {
            if let Some(phi) = phi {
                config.phi = phi;
            }
            if let Some(name) = connectivity {
                config.connectivity = ConnectivityStrategy::parse(&name)
                    .with_context(|| format!("unknown connectivity strategy '{name}'"))?;
            }
            let command = RunCommand::new(&input)
                .with_output(output)
                .with_snapshots(snapshots)
                .with_metrics_out(metrics_out);
            let summary = command
                .execute(config, observability.metrics())
                .with_context(|| format!("run over {} failed", input.display()))?;

            println!("{}", summary.summary());
            for (i, center) in summary.centers.iter().enumerate() {
                let coords: Vec<String> = center.iter().map(|c| format!("{c:.4}")).collect();
                println!("  cluster {i}: [{}]", coords.join(", "));
            }
        },
        Commands::Config { show } => {
            if show {
                let rendered = ConfigCommand::new()
                    .show(&config)
                    .context("failed to render configuration")?;
                print!("{rendered}");
            } else {
                println!("Use --show to print the effective configuration");
            }
        },
        Commands::Completions { .. } => {},
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<DycleeConfig> {
    match path {
        Some(path) => DycleeConfig::load_from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Ok(DycleeConfig::load_default()),
    }
}
