//! CLI command implementations.
//!
//! Each submodule implements one `dyclee` subcommand; the binary handles
//! argument parsing and printing.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Cluster a CSV or NDJSON dataset and write labels, snapshots and metrics |
//! | `config` | Show the effective configuration as TOML |
//! | `completions` | Generate shell completions |
//!
//! # Example Usage
//!
//! ```bash
//! dyclee run --input points.csv --output labels.csv --snapshots history.json
//! dyclee --config dyclee.toml config --show
//! dyclee completions zsh > _dyclee
//! ```

mod config;
mod run;

pub use config::ConfigCommand;
pub use run::{RunCommand, RunSummary};
