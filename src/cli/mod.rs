//! CLI command handling

use std::path::Path;
use std::time::Duration;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::engine::registry;
use crate::executor::{Executor, WorkerCommand};
use crate::ipc::Job;
use crate::testing::Suite;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Worker => {
            // Worker mode is handled in main
            Err(Error::Internal(
                "worker command must be handled before dispatch".to_string(),
            ))
        }

        Commands::Run {
            spec,
            reporter,
            timeout,
        } => {
            let default_timeout = timeout
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.defaults.timeout());
            let executor = Executor::new(WorkerCommand::from_config(config)?, default_timeout);
            let reporter = reporter.unwrap_or(config.defaults.reporter);

            let suite = Suite::load(&spec)?;
            let report = suite.run(&executor, reporter).await;
            if report.success() {
                Ok(())
            } else {
                Err(Error::Assertion(format!(
                    "{} of {} tests failed",
                    report.failures, report.tests
                )))
            }
        }

        Commands::Exec {
            script,
            workdir,
            timeout,
        } => {
            let script = script
                .canonicalize()
                .map_err(|e| Error::file_read(&script, &e))?;
            let workdir = match workdir {
                Some(dir) => dir,
                None => script
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default(),
            };

            let executor = Executor::from_config(config)?;
            let job = Job::file(&script).in_dir(workdir);
            let value = executor
                .execute(job, timeout.map(Duration::from_millis))
                .await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }

        Commands::Scenarios { json } => {
            let scenarios = registry::all_scenarios();
            if json {
                let list: Vec<_> = scenarios
                    .iter()
                    .map(|info| {
                        serde_json::json!({
                            "id": info.id,
                            "description": info.description,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                for info in scenarios {
                    println!("  {:20} {}", info.id, info.description);
                }
            }
            Ok(())
        }
    }
}
