//! CLI command definitions

use clap::Subcommand;
use std::path::PathBuf;

use crate::common::config::Reporter;

#[derive(Subcommand)]
pub enum Commands {
    /// Run every test in a fixture file (.csv, .yaml or .yml)
    Run {
        /// Path to the fixture file
        spec: PathBuf,

        /// Report format: spec or json
        #[arg(long)]
        reporter: Option<Reporter>,

        /// Default per-test timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Run one scenario script in a worker and print its result
    Exec {
        /// Path to the script
        script: PathBuf,

        /// Directory the worker runs in (default: the script's directory)
        #[arg(long)]
        workdir: Option<PathBuf>,

        /// Timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List built-in scenarios
    Scenarios {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one job read from stdin (internal use)
    #[command(hide = true)]
    Worker,
}
