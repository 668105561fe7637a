//! Error types for scenarist
//!
//! Every error maps onto a small closed [`ErrorKind`] taxonomy. The kind is what
//! crosses the worker process boundary, so the supervisor can rebuild an
//! equivalent error without knowing the worker's concrete types.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid {action} parameters: {reason}")]
    InvalidParameter { action: String, reason: String },

    #[error("Invalid fixtures for '{test}': \"{field}\" {constraint}")]
    FixtureInvalid {
        test: String,
        field: String,
        constraint: Constraint,
    },

    #[error("can't create {0} test without fixtures")]
    MissingFixtures(String),

    #[error("Missing scenario in {0}")]
    MissingScenario(String),

    #[error("{0} is not a known scenario")]
    UnknownScenario(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to load file {path}: {error}")]
    FileRead { path: String, error: String },

    #[error("Failed to listen on {addr}: {error}")]
    Bind { addr: String, error: String },

    #[error("HTTP request failed: {0}")]
    Transport(String),

    // === Parse Errors ===
    #[error("CSV error: {0}")]
    Csv(String),

    #[error("YAML error: {0}")]
    Yaml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Invalid XSD: {0}")]
    Xsd(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("HTTP protocol error: {0}")]
    HttpProtocol(String),

    #[error("Syntax error: {0}")]
    Syntax(String),

    // === Assertion Errors ===
    #[error("{0}")]
    Assertion(String),

    /// An error raised on purpose by a scenario script
    #[error("{0}")]
    Thrown(String),

    // === Executor Errors ===
    /// An error rebuilt from a worker envelope
    #[error("{message}")]
    Remote {
        kind: ErrorKind,
        message: String,
        stack: Option<String>,
    },

    #[error("Worker exited without reporting a result: {0}")]
    WorkerCrashed(String),

    #[error("Worker communication error: {0}")]
    WorkerCommunication(String),

    #[error("Timeout of {0}ms exceeded")]
    Timeout(u64),

    #[error("Panicked: {0}")]
    Panic(String),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The constraint a fixture field violated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Required,
    WrongType(&'static str),
    Unknown,
    Empty,
    Pattern(String),
    NotAllowed(Vec<String>),
    Exclusive(String),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Required => write!(f, "is required"),
            Constraint::WrongType(expected) => write!(f, "must be a {}", expected),
            Constraint::Unknown => write!(f, "is not allowed"),
            Constraint::Empty => write!(f, "is not allowed to be empty"),
            Constraint::Pattern(pattern) => {
                write!(f, "fails to match the required pattern: {}", pattern)
            }
            Constraint::NotAllowed(values) => write!(f, "must be one of [{}]", values.join(", ")),
            Constraint::Exclusive(peer) => write!(f, "conflicts with forbidden peer \"{}\"", peer),
        }
    }
}

/// Closed error taxonomy shared by supervisor and worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Io,
    Parse,
    Syntax,
    Assertion,
    Timeout,
    Panic,
    Crash,
    /// Unrecognized kinds fall back here
    #[serde(other)]
    Generic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Config => "configuration error",
            ErrorKind::Io => "I/O error",
            ErrorKind::Parse => "parse error",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::Assertion => "assertion error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Panic => "panic",
            ErrorKind::Crash => "worker crash",
            ErrorKind::Generic => "error",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_)
            | Error::ConfigParse(_)
            | Error::InvalidParameter { .. }
            | Error::FixtureInvalid { .. }
            | Error::MissingFixtures(_)
            | Error::MissingScenario(_)
            | Error::UnknownScenario(_) => ErrorKind::Config,
            Error::Io(_) | Error::FileRead { .. } | Error::Bind { .. } | Error::Transport(_) => {
                ErrorKind::Io
            }
            Error::Csv(_)
            | Error::Yaml(_)
            | Error::Json(_)
            | Error::Xml(_)
            | Error::Xsd(_)
            | Error::Template(_)
            | Error::HttpProtocol(_) => ErrorKind::Parse,
            Error::Syntax(_) => ErrorKind::Syntax,
            Error::Assertion(_) => ErrorKind::Assertion,
            Error::Remote { kind, .. } => *kind,
            Error::WorkerCrashed(_) | Error::WorkerCommunication(_) => ErrorKind::Crash,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Panic(_) => ErrorKind::Panic,
            Error::Thrown(_) | Error::Internal(_) => ErrorKind::Generic,
        }
    }

    /// Create an invalid action parameter error
    pub fn invalid_parameter(action: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            action: action.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a fixture validation error
    pub fn fixture_invalid(test: &str, field: &str, constraint: Constraint) -> Self {
        Self::FixtureInvalid {
            test: test.to_string(),
            field: field.to_string(),
            constraint,
        }
    }

    /// Create a file read error, keeping the OS message
    pub fn file_read(path: impl AsRef<std::path::Path>, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.as_ref().display().to_string(),
            error: error.to_string(),
        }
    }

    /// The chain of underlying causes, one per line
    pub fn source_chain(&self) -> Option<String> {
        let mut causes = Vec::new();
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            causes.push(format!("caused by: {}", cause));
            current = cause.source();
        }
        if causes.is_empty() {
            None
        } else {
            Some(causes.join("\n"))
        }
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Csv(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        // reqwest's own message hides the OS error, so keep the whole chain
        let mut message = e.to_string();
        let mut current = std::error::Error::source(&e);
        while let Some(cause) = current {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            current = cause.source();
        }
        Error::Transport(message)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Yaml(e.to_string())
    }
}

impl From<minijinja::Error> for Error {
    fn from(e: minijinja::Error) -> Self {
        let mut message = e.to_string();
        if let Some(detail) = e.detail() {
            if !message.contains(detail) {
                message = format!("{}: {}", message, detail);
            }
        }
        Error::Template(message)
    }
}

/// Serializable error for worker envelopes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub kind: ErrorKind,
}

impl From<&Error> for RemoteError {
    fn from(e: &Error) -> Self {
        let stack = match e {
            Error::Remote { stack, .. } => stack.clone(),
            other => other.source_chain(),
        };
        Self {
            message: e.to_string(),
            stack,
            kind: e.kind(),
        }
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        Error::Remote {
            kind: e.kind,
            message: e.message,
            stack: e.stack,
        }
    }
}
