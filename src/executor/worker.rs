//! Worker side of the executor
//!
//! A worker runs exactly one job: it reads a [`Job`] frame from stdin, runs
//! the script and writes one [`Envelope`] frame to stdout. Logs go to stderr.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::{debug, error};

use super::script::Script;
use crate::common::error::RemoteError;
use crate::common::{Error, ErrorKind, Result};
use crate::ipc::{transport, Envelope, Job, Program};

/// Exit code after a panic was reported
const PANIC_EXIT_CODE: i32 = 101;

/// Set once the envelope is written; later outcomes are dropped
static REPORTED: AtomicBool = AtomicBool::new(false);

/// Write the envelope unless one was already written
fn report(envelope: &Envelope) {
    if REPORTED.swap(true, Ordering::SeqCst) {
        return;
    }
    let bytes = match serde_json::to_vec(envelope) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to serialize result: {}", e);
            return;
        }
    };
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    if let Err(e) = transport::write_message(&mut lock, &bytes) {
        error!("Failed to write result: {}", e);
    }
}

/// Report panics from any thread as `panic` errors, then exit
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| "Box<dyn Any>".to_string());
        let stack = info
            .location()
            .map(|location| format!("at {}:{}", location.file(), location.line()));
        error!("Worker panicked: {}", message);

        report(&Envelope::Err(RemoteError {
            message: Error::Panic(message).to_string(),
            stack,
            kind: ErrorKind::Panic,
        }));
        std::process::exit(PANIC_EXIT_CODE);
    }));
}

async fn read_job() -> Result<Job> {
    let mut stdin = tokio::io::stdin();
    let frame = transport::recv_message(&mut stdin)
        .await
        .map_err(|e| Error::WorkerCommunication(format!("Failed to read job: {}", e)))?;
    Ok(serde_json::from_slice(&frame)?)
}

async fn run_job(job: Job) -> Result<Value> {
    if let Some(dir) = &job.workdir {
        debug!(workdir = %dir.display(), "Changing directory");
        std::env::set_current_dir(dir).map_err(|e| Error::file_read(dir, &e))?;
    }
    let source = match job.program {
        Program::Source(source) => source,
        Program::File(path) => tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::file_read(&path, &e))?,
    };
    Script::parse(&source)?.compile()?.settle(()).await
}

/// Run one job and report its outcome
///
/// The caller should exit the process afterwards: tasks the script spawned
/// may still be running.
pub async fn serve() {
    install_panic_hook();

    let outcome = match read_job().await {
        Ok(job) => run_job(job).await,
        Err(e) => Err(e),
    };
    match &outcome {
        Ok(_) => debug!("Job succeeded"),
        Err(e) => debug!(kind = ?e.kind(), "Job failed: {}", e),
    }

    report(&match outcome {
        Ok(value) => Envelope::Result(value),
        Err(e) => Envelope::error(&e),
    });
}
