//! IPC protocol message types
//!
//! Both messages travel as length-prefixed JSON (see [`super::transport`]).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::common::error::{Error, RemoteError};

/// Work sent from the supervisor to a fresh worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Directory the worker switches to before running the program
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
    /// The scenario script to run
    pub program: Program,
}

impl Job {
    /// A job running script source text
    pub fn source(source: impl Into<String>) -> Self {
        Self {
            workdir: None,
            program: Program::Source(source.into()),
        }
    }

    /// A job running a script file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            workdir: None,
            program: Program::File(path.into()),
        }
    }

    pub fn in_dir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }
}

/// Where the worker finds its script
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Program {
    Source(String),
    /// Read by the worker, relative to its working directory
    File(PathBuf),
}

/// The single message a worker sends back
///
/// Serialized as `{"result": ...}` or `{"err": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Envelope {
    Result(serde_json::Value),
    Err(RemoteError),
}

impl Envelope {
    pub fn error(error: &Error) -> Self {
        Envelope::Err(RemoteError::from(error))
    }

    /// Convert back into the outcome it describes
    pub fn into_result(self) -> Result<serde_json::Value, Error> {
        match self {
            Envelope::Result(value) => Ok(value),
            Envelope::Err(remote) => Err(remote.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;

    #[test]
    fn test_envelope_wire_shape() {
        let ok = serde_json::to_value(Envelope::Result(serde_json::json!(3))).unwrap();
        assert_eq!(ok, serde_json::json!({"result": 3}));

        let err = Envelope::error(&Error::Assertion("nope".into()));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["err"]["message"], "nope");
        assert_eq!(json["err"]["kind"], "assertion");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_envelope_into_result() {
        let env: Envelope =
            serde_json::from_str(r#"{"err":{"message":"late","kind":"timeout"}}"#).unwrap();
        let err = env.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.to_string(), "late");
    }

    #[test]
    fn test_job_serialization() {
        let job = Job::file("scenario.yaml").in_dir("/tmp");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["program"]["type"], "file");
        assert_eq!(json["workdir"], "/tmp");
    }
}
