//! Hierarchical (`.yaml`/`.yml`) fixture files
//!
//! ```yaml
//! scenario: request          # id, file path or multi-line inline source
//! timeout: 1000              # optional default for every test, in ms
//! host: http://localhost     # everything else is common to all tests
//! tests:
//!   - name: home page
//!     url: /
//!     code: 200
//!   - url: /users
//!     body: !include bodies/user.yaml
//!     code: 201
//! ```

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value as YamlValue};
use tracing::debug;

use super::tabular::timeout_millis;
use super::tree;
use crate::common::{Error, Result};
use crate::engine::{registry, Test};

/// Tag that splices another YAML file in place
const INCLUDE_TAG: &str = "include";

/// Guard against include cycles
const MAX_INCLUDE_DEPTH: usize = 32;

/// Parse a YAML fixture file
pub fn parse_file(path: &Path) -> Result<Vec<Test>> {
    let content = fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
    let path = fs::canonicalize(path).map_err(|e| Error::file_read(path, &e))?;
    let base_dir = super::parent_dir(&path);

    debug!(path = %path.display(), "Parsing YAML fixtures");
    let document = load_document(&content, &path.display().to_string(), &base_dir, 0)?;
    parse_document(document, &path.display().to_string(), &base_dir)
}

/// Parse YAML fixture text, resolving includes against `base_dir`
pub fn parse_str(content: &str, base_dir: &Path) -> Result<Vec<Test>> {
    let document = load_document(content, "<string>", base_dir, 0)?;
    parse_document(document, "<string>", base_dir)
}

fn parse_document(document: Value, origin: &str, base_dir: &Path) -> Result<Vec<Test>> {
    let mut root = match document {
        Value::Null => return Ok(Vec::new()),
        Value::Object(root) => root,
        _ => {
            return Err(Error::Yaml(format!(
                "{}: expected a mapping at the top level",
                origin
            )))
        }
    };

    let reference = match root.remove("scenario") {
        Some(Value::String(reference)) => reference,
        _ => return Err(Error::MissingScenario(origin.to_string())),
    };
    let default_timeout = root
        .remove("timeout")
        .map(|value| timeout_millis("defaults", &value))
        .transpose()?;
    let cases = match root.remove("tests") {
        Some(Value::Array(cases)) => cases,
        None | Some(Value::Null) => Vec::new(),
        Some(_) => {
            return Err(Error::Yaml(format!("{}: 'tests' must be a list", origin)));
        }
    };

    let (scenario, workdir) = registry::resolve(&reference, base_dir)?;
    let common = Value::Object(root);

    cases
        .into_iter()
        .enumerate()
        .map(|(index, case)| {
            let mut case = match case {
                Value::Object(case) => case,
                Value::Null => Map::new(),
                _ => {
                    return Err(Error::Yaml(format!(
                        "{}: test {} must be a mapping",
                        origin,
                        index + 1
                    )))
                }
            };
            let name = match case.remove("name") {
                Some(Value::String(name)) => name,
                Some(other) => other.to_string(),
                None => format!("test {}", index + 1),
            };
            let timeout = match case.remove("timeout") {
                Some(value) => Some(timeout_millis(&name, &value)?),
                None => default_timeout,
            };
            let fixtures = tree::deep_merge(common.clone(), Value::Object(case));
            Ok(Test::new(name, scenario.clone(), fixtures, workdir.clone())?.with_timeout(timeout))
        })
        .collect()
}

/// Parse YAML text into a JSON tree, splicing `!include` files in
fn load_document(content: &str, origin: &str, base_dir: &Path, depth: usize) -> Result<Value> {
    let document: YamlValue = serde_yaml::from_str(content)
        .map_err(|e| Error::Yaml(format!("{}: {}", origin, e)))?;
    let document = resolve_includes(document, base_dir, depth)?;
    serde_json::to_value(document).map_err(|e| Error::Yaml(format!("{}: {}", origin, e)))
}

fn resolve_includes(value: YamlValue, base_dir: &Path, depth: usize) -> Result<YamlValue> {
    match value {
        YamlValue::Tagged(tagged) if tagged.tag == INCLUDE_TAG => {
            let relative = tagged.value.as_str().ok_or_else(|| {
                Error::Yaml(format!("!{} expects a file path", INCLUDE_TAG))
            })?;
            include(&base_dir.join(relative), depth + 1)
        }
        YamlValue::Tagged(tagged) => {
            let TaggedValue { tag, value } = *tagged;
            Ok(YamlValue::Tagged(Box::new(TaggedValue {
                tag,
                value: resolve_includes(value, base_dir, depth)?,
            })))
        }
        YamlValue::Sequence(items) => items
            .into_iter()
            .map(|item| resolve_includes(item, base_dir, depth))
            .collect::<Result<Vec<_>>>()
            .map(YamlValue::Sequence),
        YamlValue::Mapping(entries) => entries
            .into_iter()
            .map(|(key, value)| Ok((key, resolve_includes(value, base_dir, depth)?)))
            .collect::<Result<Mapping>>()
            .map(YamlValue::Mapping),
        scalar => Ok(scalar),
    }
}

fn include(path: &Path, depth: usize) -> Result<YamlValue> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(Error::Yaml(format!(
            "{}: includes nested deeper than {}",
            path.display(),
            MAX_INCLUDE_DEPTH
        )));
    }
    let content = fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
    let included: YamlValue = serde_yaml::from_str(&content)
        .map_err(|e| Error::Yaml(format!("{}: {}", path.display(), e)))?;
    let dir = super::parent_dir(path);
    resolve_includes(included, &dir, depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;
    use crate::engine::ScenarioRef;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_common_fixtures_merge_under_each_test() {
        let tests = parse_str(
            r#"
scenario: request
timeout: 700
host: http://localhost
headers:
  accept: json
  lang: en
tests:
  - name: home
    url: /
    code: 200
    headers:
      lang: fr
  - url: /missing
    code: 404
    timeout: 50
"#,
            Path::new("/tmp"),
        )
        .unwrap();

        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].name, "home");
        assert_eq!(
            tests[0].fixtures,
            json!({
                "host": "http://localhost",
                "headers": {"accept": "json", "lang": "fr"},
                "url": "/",
                "code": 200
            })
        );
        assert_eq!(tests[0].timeout, Some(Duration::from_millis(700)));
        assert_eq!(tests[1].name, "test 2");
        assert_eq!(tests[1].timeout, Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_empty_document() {
        assert!(parse_str("", Path::new("/tmp")).unwrap().is_empty());
    }

    #[test]
    fn test_missing_scenario() {
        let err = parse_str("tests: []\n", Path::new("/tmp")).unwrap_err();
        assert_eq!(err.to_string(), "Missing scenario in <string>");
    }

    #[test]
    fn test_unknown_scenario() {
        let err = parse_str("scenario: nope.yaml\ntests: []\n", Path::new("/tmp")).unwrap_err();
        assert_eq!(err.to_string(), "nope.yaml is not a known scenario");
    }

    #[test]
    fn test_inline_scenario() {
        let tests = parse_str(
            "scenario: |\n  return: {{ value }}\n  result: content\ntests:\n  - value: 3\n",
            Path::new("/tmp"),
        )
        .unwrap();
        assert!(matches!(&tests[0].scenario, ScenarioRef::Inline(source) if source.contains("{{ value }}")));
        assert_eq!(tests[0].workdir, Path::new("/tmp"));
    }

    #[test]
    fn test_includes_resolve_relative_to_including_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("parts")).unwrap();
        std::fs::write(
            dir.path().join("parts/user.yaml"),
            "name: ada\naddress: !include address.yaml\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("parts/address.yaml"), "city: London\n").unwrap();
        std::fs::write(dir.path().join("scenario.yaml"), "return: 1\n").unwrap();
        let spec = dir.path().join("spec.yaml");
        std::fs::write(
            &spec,
            "scenario: scenario.yaml\ntests:\n  - user: !include parts/user.yaml\n",
        )
        .unwrap();

        let tests = parse_file(&spec).unwrap();
        assert_eq!(
            tests[0].fixtures,
            json!({"user": {"name": "ada", "address": {"city": "London"}}})
        );
        assert!(matches!(tests[0].scenario, ScenarioRef::File(_)));
    }

    #[test]
    fn test_missing_include_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_str(
            "scenario: request\ntests:\n  - body: !include nowhere.yaml\n",
            dir.path(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_include_cycle_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("loop.yaml"), "again: !include loop.yaml\n").unwrap();
        let err = parse_str("scenario: request\nx: !include loop.yaml\n", dir.path()).unwrap_err();
        assert!(err.to_string().contains("nested deeper"));
    }

    #[test]
    fn test_syntax_error_is_positional() {
        let err = parse_str("scenario: [unclosed\n", Path::new("/tmp")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("line"));
    }
}
