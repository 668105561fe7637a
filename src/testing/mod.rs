//! Test suite adapter
//!
//! Turns the tests parsed from a fixture file into a sequential suite and
//! reports each case as it completes.

mod report;
mod suite;

pub use report::{CaseReport, Report};
pub use suite::Suite;
