//! Tabular (`.csv`) fixture files
//!
//! `;`-separated, first row is the header. Each row becomes one test. Dotted
//! column names nest (`user.name`), empty cells are left out, and the `name`,
//! `timeout` and `scenario` columns configure the test instead of its fixtures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::tree;
use crate::common::error::Constraint;
use crate::common::{Error, Result};
use crate::engine::{registry, Test};

/// Parse a CSV fixture file
///
/// A file named `anything-<id>.csv` supplies `<id>` as the scenario of rows
/// that have no `scenario` column.
pub fn parse_file(path: &Path) -> Result<Vec<Test>> {
    let content = fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
    let path = fs::canonicalize(path).map_err(|e| Error::file_read(path, &e))?;
    let base_dir = super::parent_dir(&path);
    let file_scenario = scenario_from_file_name(&path);

    debug!(path = %path.display(), scenario = ?file_scenario, "Parsing CSV fixtures");
    parse_str(&content, file_scenario.as_deref(), &base_dir)
}

/// Parse CSV fixture text
pub fn parse_str(content: &str, file_scenario: Option<&str>, base_dir: &Path) -> Result<Vec<Test>> {
    check_quotes(content)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let mut tests = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let cells = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(column, cell)| (column, tree::cast(cell)));
        let mut fixtures = tree::unflatten(cells);

        let name = match fixtures.remove("name") {
            Some(Value::String(name)) => name,
            Some(other) => other.to_string(),
            None => format!("test {}", index + 1),
        };
        let timeout = fixtures
            .remove("timeout")
            .map(|value| timeout_millis(&name, &value))
            .transpose()?;
        let scenario = match fixtures.remove("scenario") {
            Some(Value::String(id)) => id,
            Some(_) => {
                return Err(Error::fixture_invalid(
                    &name,
                    "scenario",
                    Constraint::WrongType("string"),
                ))
            }
            None => file_scenario
                .map(str::to_string)
                .ok_or_else(|| Error::MissingScenario(format!("test '{}'", name)))?,
        };

        let (scenario, workdir) = registry::resolve(&scenario, base_dir)?;
        let test = Test::new(name, scenario, Value::Object(fixtures), workdir)?;
        tests.push(test.with_timeout(timeout));
    }
    Ok(tests)
}

/// Timeout cell or key, in milliseconds
pub(super) fn timeout_millis(test: &str, value: &Value) -> Result<Duration> {
    value
        .as_u64()
        .map(Duration::from_millis)
        .ok_or_else(|| Error::fixture_invalid(test, "timeout", Constraint::WrongType("number")))
}

/// `requests-request.csv` → `request`
fn scenario_from_file_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let (_, id) = stem.rsplit_once('-')?;
    (!id.is_empty()).then(|| id.to_string())
}

/// Reject quoted fields that never close
///
/// The csv reader is lenient here and would swallow the rest of the file.
fn check_quotes(content: &str) -> Result<()> {
    let mut line = 1;
    let mut open_at = None;
    let mut field_start = true;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if open_at.is_some() {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                } else {
                    open_at = None;
                }
            }
        } else {
            if c == '"' && field_start {
                open_at = Some(line);
            }
            field_start = c == ';' || c == '\n';
        }
        if c == '\n' {
            line += 1;
        }
    }

    match open_at {
        Some(line) => Err(Error::Csv(format!(
            "Quoted field not terminated at line {}",
            line
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;
    use crate::engine::ScenarioRef;
    use serde_json::json;

    const HEADER: &str = "host;url;method;code;user.name\n";

    fn parse(content: &str) -> Result<Vec<Test>> {
        parse_str(content, Some("request"), Path::new("/tmp"))
    }

    #[test]
    fn test_rows_become_tests() {
        let tests = parse(&format!(
            "{}http://localhost;/a;GET;200;ada\n\nhttp://localhost;/b;;404;\n",
            HEADER
        ))
        .unwrap();
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].name, "test 1");
        assert_eq!(
            tests[0].fixtures,
            json!({"host": "http://localhost", "url": "/a", "method": "GET", "code": 200, "user": {"name": "ada"}})
        );
        assert_eq!(tests[1].name, "test 2");
        assert_eq!(
            tests[1].fixtures,
            json!({"host": "http://localhost", "url": "/b", "code": 404})
        );
        assert!(matches!(tests[0].scenario, ScenarioRef::Registered(info) if info.id == "request"));
    }

    #[test]
    fn test_dotted_columns_nest_and_cells_are_cast() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("echo.yaml"), "return: 1\n").unwrap();

        let tests = parse_str("a.b.c;a.d;n\ntrue;x;3\n", Some("echo.yaml"), dir.path()).unwrap();
        assert_eq!(
            tests[0].fixtures,
            json!({"a": {"b": {"c": true}, "d": "x"}, "n": 3})
        );
        assert!(matches!(tests[0].scenario, ScenarioRef::File(_)));
    }

    #[test]
    fn test_empty_file() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse(HEADER).unwrap().is_empty());
    }

    #[test]
    fn test_reserved_columns() {
        let tests = parse("name;timeout;host;url;code\nhome page;500;http://x;/;200\n").unwrap();
        assert_eq!(tests[0].name, "home page");
        assert_eq!(tests[0].timeout, Some(Duration::from_millis(500)));
        assert!(tests[0].fixtures.get("name").is_none());
        assert!(tests[0].fixtures.get("timeout").is_none());
    }

    #[test]
    fn test_scenario_column_wins_over_file_name() {
        let err = parse("scenario;a\nunknown_one;1\n").unwrap_err();
        assert_eq!(err.to_string(), "unknown_one is not a known scenario");
    }

    #[test]
    fn test_missing_scenario() {
        let err = parse_str("a\n1\n", None, Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, Error::MissingScenario(_)));
        assert!(err.to_string().contains("test 1"));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = parse("host;url\n\"http://x;/\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("Quoted field not terminated at line 2"));
    }

    #[test]
    fn test_escaped_quotes_are_fine() {
        let tests = parse("host;url;code;bodyStr\nhttp://x;/;200;\"say \"\"hi\"\"\"\n").unwrap();
        assert_eq!(tests[0].fixtures["bodyStr"], "say \"hi\"");
    }

    #[test]
    fn test_unequal_row_length() {
        let err = parse("host;url\nhttp://x;/;extra\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("fields"));
    }

    #[test]
    fn test_schema_violation_surfaces() {
        let err = parse("host;url;code\nftp://x;/;200\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_scenario_from_file_name() {
        assert_eq!(
            scenario_from_file_name(Path::new("/a/users-request.csv")).as_deref(),
            Some("request")
        );
        assert_eq!(scenario_from_file_name(Path::new("/a/users.csv")), None);
    }

    #[test]
    fn test_missing_file_keeps_os_message() {
        let err = parse_file(Path::new("/nonexistent/x-request.csv")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("No such file or directory"));
    }
}
