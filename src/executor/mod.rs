//! Isolated execution of scenario scripts
//!
//! The supervisor sends a script to a child process running in worker mode
//! and waits for one result frame. Everything the script does, including
//! panics and hangs, stays inside that process.

mod script;
mod supervisor;
pub mod worker;

pub use script::{Script, Style};
pub use supervisor::{Executor, WorkerCommand, WorkerState};
