//! Supervisor side of the executor
//!
//! Every job gets a fresh worker process, so a test that panics, hangs or
//! leaks state cannot affect the next one.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::ipc::{transport, Envelope, Job};

/// Stderr lines kept for crash reports
const STDERR_TAIL_LINES: usize = 20;

/// How long to wait for a dead worker's status and stderr
const REAP_TIMEOUT: Duration = Duration::from_secs(1);

/// How to start a worker
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.worker_program()?,
            config.executor.worker_args.clone(),
        ))
    }
}

/// Lifecycle of one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Spawned,
    CodeSent,
    ResultReceived,
    ErrorReceived,
    WorkerCrashed,
    TimedOut,
    Terminated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Spawned => "spawned",
            WorkerState::CodeSent => "code sent",
            WorkerState::ResultReceived => "result received",
            WorkerState::ErrorReceived => "error received",
            WorkerState::WorkerCrashed => "worker crashed",
            WorkerState::TimedOut => "timed out",
            WorkerState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Runs jobs in isolated worker processes
#[derive(Debug, Clone)]
pub struct Executor {
    command: WorkerCommand,
    default_timeout: Duration,
}

impl Executor {
    pub fn new(command: WorkerCommand, default_timeout: Duration) -> Self {
        Self {
            command,
            default_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            WorkerCommand::from_config(config)?,
            config.defaults.timeout(),
        ))
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run `job` in a fresh worker and return its result
    ///
    /// The worker is killed once the outcome is known, whatever it is.
    pub async fn execute(&self, job: Job, timeout: Option<Duration>) -> Result<Value> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let mut run = WorkerRun::spawn(&self.command)?;
        let outcome = run.drive(&job, timeout).await;
        run.terminate().await;
        outcome
    }
}

/// One worker process and its state
struct WorkerRun {
    child: Child,
    pid: Option<u32>,
    state: WorkerState,
    stderr: Option<JoinHandle<VecDeque<String>>>,
}

impl WorkerRun {
    fn spawn(command: &WorkerCommand) -> Result<Self> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::WorkerCommunication(format!(
                    "Failed to start {}: {}",
                    command.program.display(),
                    e
                ))
            })?;

        let pid = child.id();
        let stderr = child.stderr.take().map(|stderr| tokio::spawn(forward_stderr(stderr, pid)));
        let run = Self {
            child,
            pid,
            state: WorkerState::Spawned,
            stderr,
        };
        debug!(pid = ?run.pid, state = %run.state, "Worker state");
        Ok(run)
    }

    fn transition(&mut self, state: WorkerState) {
        debug!(pid = ?self.pid, from = %self.state, to = %state, "Worker state");
        self.state = state;
    }

    async fn drive(&mut self, job: &Job, timeout: Duration) -> Result<Value> {
        let frame = serde_json::to_vec(job)?;
        let mut stdin = self.child.stdin.take().ok_or_else(|| {
            Error::WorkerCommunication("Failed to get worker stdin".to_string())
        })?;
        let mut stdout = self.child.stdout.take().ok_or_else(|| {
            Error::WorkerCommunication("Failed to get worker stdout".to_string())
        })?;
        let deadline = tokio::time::Instant::now() + timeout;

        match tokio::time::timeout_at(deadline, transport::send_message(&mut stdin, &frame)).await {
            Ok(Ok(())) => self.transition(WorkerState::CodeSent),
            // A worker that died early shows up as EOF below
            Ok(Err(e)) => debug!(pid = ?self.pid, "Failed to send job: {}", e),
            Err(_) => return Err(self.timed_out(timeout)),
        }
        drop(stdin);

        let frame = match tokio::time::timeout_at(deadline, transport::recv_message(&mut stdout)).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                self.transition(WorkerState::WorkerCrashed);
                return Err(self.crash_report().await);
            }
            Ok(Err(e)) => {
                self.transition(WorkerState::WorkerCrashed);
                return Err(Error::WorkerCommunication(format!(
                    "Failed to read worker result: {}",
                    e
                )));
            }
            Err(_) => return Err(self.timed_out(timeout)),
        };

        let envelope: Envelope = serde_json::from_slice(&frame).map_err(|e| {
            Error::WorkerCommunication(format!("Malformed worker result: {}", e))
        })?;
        match envelope.into_result() {
            Ok(value) => {
                self.transition(WorkerState::ResultReceived);
                Ok(value)
            }
            Err(e) => {
                self.transition(WorkerState::ErrorReceived);
                Err(e)
            }
        }
    }

    fn timed_out(&mut self, timeout: Duration) -> Error {
        self.transition(WorkerState::TimedOut);
        Error::Timeout(timeout.as_millis() as u64)
    }

    /// Exit status and the end of stderr
    async fn crash_report(&mut self) -> Error {
        let status = match tokio::time::timeout(REAP_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => status.to_string(),
            Ok(Err(e)) => format!("unknown exit status: {}", e),
            Err(_) => "worker closed its output but is still running".to_string(),
        };
        let tail = match self.stderr.take() {
            Some(task) => match tokio::time::timeout(REAP_TIMEOUT, task).await {
                Ok(Ok(lines)) => Vec::from(lines).join("\n"),
                _ => String::new(),
            },
            None => String::new(),
        };
        if tail.is_empty() {
            Error::WorkerCrashed(status)
        } else {
            Error::WorkerCrashed(format!("{}\n{}", status, tail))
        }
    }

    async fn terminate(mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!(pid = ?self.pid, "Worker already gone: {}", e);
        }
        let _ = self.child.wait().await;
        if let Some(task) = self.stderr.take() {
            task.abort();
        }
        self.transition(WorkerState::Terminated);
    }
}

/// Forward worker stderr to our logs, keeping the last lines
async fn forward_stderr(stderr: ChildStderr, pid: Option<u32>) -> VecDeque<String> {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(pid = ?pid, "worker: {}", line);
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail
}
