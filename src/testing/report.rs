//! Suite reports and reporters

use colored::Colorize;
use serde::Serialize;

use crate::common::config::Reporter;
use crate::common::{Error, ErrorKind};

/// Outcome of one test case
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub name: String,
    pub passed: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl CaseReport {
    pub fn passed(name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            passed: true,
            duration_ms,
            error: None,
            kind: None,
        }
    }

    pub fn failed(name: impl Into<String>, duration_ms: u64, error: &Error) -> Self {
        Self {
            name: name.into(),
            passed: false,
            duration_ms,
            error: Some(error.to_string()),
            kind: Some(error.kind()),
        }
    }
}

/// Outcome of a whole suite
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub tests: usize,
    pub passes: usize,
    pub failures: usize,
    pub duration_ms: u64,
    pub cases: Vec<CaseReport>,
}

impl Report {
    pub fn record(&mut self, case: CaseReport) {
        self.tests += 1;
        if case.passed {
            self.passes += 1;
        } else {
            self.failures += 1;
        }
        self.cases.push(case);
    }

    pub fn success(&self) -> bool {
        self.failures == 0
    }
}

/// Print progress as cases complete and a summary at the end
pub fn print_start(reporter: Reporter, title: &str) {
    if reporter == Reporter::Spec {
        println!("\n  {}", title.bold());
    }
}

pub fn print_case(reporter: Reporter, case: &CaseReport) {
    if reporter != Reporter::Spec {
        return;
    }
    let duration = format!("({}ms)", case.duration_ms).dimmed();
    if case.passed {
        println!("    {} {} {}", "✓".green(), case.name, duration);
    } else {
        println!("    {} {} {}", "✗".red(), case.name.red(), duration);
    }
}

pub fn print_summary(reporter: Reporter, report: &Report) {
    match reporter {
        Reporter::Json => match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize report: {}", e),
        },
        Reporter::Spec => {
            println!();
            println!(
                "  {} {}",
                format!("{} passing", report.passes).green(),
                format!("({}ms)", report.duration_ms).dimmed()
            );
            if report.failures > 0 {
                println!("  {}", format!("{} failing", report.failures).red());
            }
            let failed = report.cases.iter().filter(|case| !case.passed);
            for (index, case) in failed.enumerate() {
                println!("\n  {}) {}", index + 1, case.name);
                if let Some(error) = &case.error {
                    for line in error.lines() {
                        println!("     {}", line.red());
                    }
                }
            }
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts() {
        let mut report = Report::default();
        report.record(CaseReport::passed("a", 3));
        report.record(CaseReport::failed("b", 4, &Error::Assertion("no".into())));
        assert_eq!((report.tests, report.passes, report.failures), (2, 1, 1));
        assert!(!report.success());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cases"][1]["kind"], "assertion");
        assert!(json["cases"][0].get("error").is_none());
    }
}
