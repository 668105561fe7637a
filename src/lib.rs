//! scenarist - data-driven integration testing
//!
//! Tests are rows of a CSV file or entries of a YAML file. Each one names a
//! scenario and carries fixtures; the scenario template is rendered with them
//! into a script of [`actions`] and run by an isolated [`executor`] worker.

pub mod actions;
pub mod cli;
pub mod commands;
pub mod common;
pub mod engine;
pub mod executor;
pub mod fixture;
pub mod http;
pub mod ipc;
pub mod testing;
pub mod xml;

// Re-export commonly used types for tests
pub use common::{Error, ErrorKind, Result};
pub use engine::{ScenarioRef, Test};
