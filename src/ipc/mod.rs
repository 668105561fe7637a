//! IPC between the supervisor and its worker processes
//!
//! The worker's stdin carries one [`protocol::Job`] frame and its stdout
//! carries back one [`protocol::Envelope`] frame.

pub mod protocol;
pub mod transport;

pub use protocol::{Envelope, Job, Program};
