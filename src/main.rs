//! scenarist - data-driven integration test runner
//!
//! Reads tests from CSV or YAML fixture files, renders each into a scenario
//! script and runs it in an isolated worker process.

use std::path::PathBuf;

use clap::Parser;
use scenarist::commands::Commands;
use scenarist::common::config::Config;
use scenarist::common::logging;
use scenarist::{cli, executor};

#[derive(Parser)]
#[command(name = "scenarist", about = "Fixture-driven integration test runner")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: ./scenarist.toml, then the user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Commands::Worker = cli.command {
        logging::init_worker();
        executor::worker::serve().await;
        // Tasks spawned by the script must not keep the worker alive
        std::process::exit(0);
    }

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let guard = logging::init_cli(&config.logging);

    let result = cli::dispatch(cli.command, &config).await;
    drop(guard);

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
