//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::{config_path, LOCAL_CONFIG_FILE};
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Worker process settings
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Report format printed after a run
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Reporter {
    /// One colored line per test case
    #[default]
    Spec,
    /// The full report as JSON on stdout
    Json,
}

impl std::str::FromStr for Reporter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "spec" => Ok(Reporter::Spec),
            "json" => Ok(Reporter::Json),
            other => Err(Error::Config(format!(
                "Unknown reporter '{}'. Supported reporters: 'spec', 'json'",
                other
            ))),
        }
    }
}

/// Default settings
#[derive(Debug, Deserialize, Clone)]
pub struct Defaults {
    /// Timeout applied to tests that don't declare their own
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Reporter used when none is given on the command line
    #[serde(default)]
    pub reporter: Reporter,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout(),
            reporter: Reporter::default(),
        }
    }
}

impl Defaults {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout() -> u64 {
    2000
}

/// Worker process configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ExecutorConfig {
    /// Program spawned for each test (path or name on PATH).
    /// Defaults to the running executable.
    pub worker: Option<PathBuf>,

    /// Arguments passed to the worker program
    #[serde(default = "default_worker_args")]
    pub worker_args: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker: None,
            worker_args: default_worker_args(),
        }
    }
}

fn default_worker_args() -> Vec<String> {
    vec!["worker".to_string()]
}

/// Logging configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is not set (e.g. "scenarist=debug")
    pub level: Option<String>,

    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `./scenarist.toml`, then the user config file
    ///
    /// Returns default configuration if neither exists
    pub fn load() -> Result<Self> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Self::load_from(&local);
        }
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Resolve the worker program
    ///
    /// A configured bare name is searched on PATH
    pub fn worker_program(&self) -> Result<PathBuf> {
        match &self.executor.worker {
            Some(program) if program.components().count() == 1 && !program.exists() => {
                which::which(program).map_err(|e| {
                    Error::Config(format!(
                        "Worker program '{}' not found: {}",
                        program.display(),
                        e
                    ))
                })
            }
            Some(program) => Ok(program.clone()),
            None => std::env::current_exe().map_err(|e| {
                Error::Internal(format!("Failed to get current executable path: {}", e))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.defaults.timeout_ms, 2000);
        assert_eq!(config.defaults.reporter, Reporter::Spec);
        assert!(config.executor.worker.is_none());
    }

    #[test]
    fn test_parse_partial_file() {
        let config: Config = toml::from_str(
            r#"
[defaults]
timeout_ms = 500
reporter = "json"

[executor]
worker = "/usr/local/bin/scenarist"
"#,
        )
        .unwrap();
        assert_eq!(config.defaults.timeout(), Duration::from_millis(500));
        assert_eq!(config.defaults.reporter, Reporter::Json);
        assert_eq!(config.executor.worker_args, vec!["worker".to_string()]);
        assert_eq!(
            config.worker_program().unwrap(),
            PathBuf::from("/usr/local/bin/scenarist")
        );
    }

    #[test]
    fn test_reporter_from_str() {
        assert_eq!("json".parse::<Reporter>().unwrap(), Reporter::Json);
        assert!("tap".parse::<Reporter>().is_err());
    }
}
