//! Sequential suite runner

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use super::report::{self, CaseReport, Report};
use crate::common::config::Reporter;
use crate::common::Result;
use crate::engine::Test;
use crate::executor::Executor;
use crate::fixture;

/// Tests from one fixture file, run in file order
#[derive(Debug, Clone)]
pub struct Suite {
    pub title: String,
    pub tests: Vec<Test>,
}

impl Suite {
    pub fn new(title: impl Into<String>, tests: Vec<Test>) -> Self {
        Self {
            title: title.into(),
            tests,
        }
    }

    /// Parse a fixture file into a suite titled after it
    pub fn load(path: &Path) -> Result<Self> {
        let tests = fixture::load(path)?;
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(title, tests))
    }

    /// Run every test, one at a time
    ///
    /// A failing test is recorded and the suite moves on.
    pub async fn run(&self, executor: &Executor, reporter: Reporter) -> Report {
        info!(suite = %self.title, tests = self.tests.len(), "Running suite");
        report::print_start(reporter, &self.title);

        let started = Instant::now();
        let mut report = Report::default();
        for test in &self.tests {
            let case_started = Instant::now();
            let outcome = test.run(executor).await;
            let duration_ms = case_started.elapsed().as_millis() as u64;

            let case = match outcome {
                Ok(_) => CaseReport::passed(&test.name, duration_ms),
                Err(e) => {
                    warn!(test = %test.name, kind = ?e.kind(), "Test failed: {}", e);
                    CaseReport::failed(&test.name, duration_ms, &e)
                }
            };
            report::print_case(reporter, &case);
            report.record(case);
        }
        report.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            passes = report.passes,
            failures = report.failures,
            duration_ms = report.duration_ms,
            "Suite finished"
        );
        report::print_summary(reporter, &report);
        report
    }
}
