//! Scenario registry
//!
//! Built-in scenarios are looked up by id. Each one declares the fixtures it
//! accepts and the script template rendered from them.

use std::path::{Path, PathBuf};

use super::schema::{Field, FieldType, FixtureSchema};
use super::test::ScenarioRef;
use crate::common::{Error, Result};

/// A registered scenario
#[derive(Debug)]
pub struct ScenarioInfo {
    /// Identifier used in fixture files (e.g., "request")
    pub id: &'static str,
    /// Brief description
    pub description: &'static str,
    /// Script template, rendered in code mode with the fixtures
    pub template: &'static str,
    schema: fn() -> FixtureSchema,
}

impl ScenarioInfo {
    /// Fixture rules for this scenario
    pub fn schema(&self) -> FixtureSchema {
        (self.schema)()
    }
}

const METHODS: &[&str] = &["GET", "POST", "PUT", "HEAD", "DELETE"];

fn request_schema() -> FixtureSchema {
    FixtureSchema::new()
        .field(Field::string("host").required().pattern(r"^https?://"))
        .field(Field::string("url").required().non_empty())
        .field(Field::string("method").one_of(METHODS))
        .field(Field::string("body"))
        .field(Field::string("bodyStr"))
        .field(Field::number("code").required())
        .field(Field::string("contentType"))
        .field(Field::string("xsd"))
        .field(Field::string("xsdStr"))
        .exclusive("body", "bodyStr")
        .exclusive("xsd", "xsdStr")
        .allow_unknown()
}

fn request_and_listen_schema() -> FixtureSchema {
    request_schema().field(Field::new("listeningPort", FieldType::Number).required())
}

const REQUEST_TEMPLATE: &str = r#"data: {{ fixtures }}
steps:
  - action: request
    url: {{ host ~ url }}
{%- if method is defined %}
    method: {{ method }}
{%- endif %}
{%- if contentType is defined %}
    headers:
      content-type: {{ contentType }}
{%- endif %}
{%- if body is defined %}
    body_from:
      - action: load
        path: {{ body }}
      - action: render
{%- elif bodyStr is defined %}
    body_from:
      - action: render
        template: {{ bodyStr }}
{%- endif %}
  - action: expect_status_code
    code: {{ code }}
{%- if xsd is defined %}
  - action: expect_to_match_xsd
    xsd_from:
      - action: load
        path: {{ xsd }}
{%- elif xsdStr is defined %}
  - action: expect_to_match_xsd
    xsd: {{ xsdStr }}
{%- endif %}
"#;

const REQUEST_AND_LISTEN_TEMPLATE: &str = r#"data: {{ fixtures }}
steps:
  - action: listen
    port: {{ listeningPort }}
    url: "/"
    trigger:
      - action: request
        url: {{ host ~ url }}
{%- if method is defined %}
        method: {{ method }}
{%- endif %}
{%- if contentType is defined %}
        headers:
          content-type: {{ contentType }}
{%- endif %}
{%- if body is defined %}
        body_from:
          - action: load
            path: {{ body }}
          - action: render
{%- elif bodyStr is defined %}
        body_from:
          - action: render
            template: {{ bodyStr }}
{%- endif %}
      - action: expect_status_code
        code: {{ code }}
{%- if xsd is defined %}
      - action: expect_to_match_xsd
        xsd_from:
          - action: load
            path: {{ xsd }}
{%- elif xsdStr is defined %}
      - action: expect_to_match_xsd
        xsd: {{ xsdStr }}
{%- endif %}
"#;

/// All built-in scenarios
static SCENARIOS: &[ScenarioInfo] = &[
    ScenarioInfo {
        id: "request",
        description: "Send an HTTP request and check the response status (and XSD)",
        template: REQUEST_TEMPLATE,
        schema: request_schema,
    },
    ScenarioInfo {
        id: "request_and_listen",
        description: "Send an HTTP request and wait for a GET / call-back on a local port",
        template: REQUEST_AND_LISTEN_TEMPLATE,
        schema: request_and_listen_schema,
    },
];

/// Get all registered scenarios
pub fn all_scenarios() -> &'static [ScenarioInfo] {
    SCENARIOS
}

/// Get a scenario by id
pub fn get_scenario(id: &str) -> Option<&'static ScenarioInfo> {
    SCENARIOS.iter().find(|s| s.id == id)
}

/// Look up a scenario by id, failing on miss
pub fn lookup(id: &str) -> Result<&'static ScenarioInfo> {
    get_scenario(id).ok_or_else(|| Error::UnknownScenario(id.to_string()))
}

/// Resolve a scenario reference found in a fixture file
///
/// In order: a registered id, a file relative to `base_dir`, multi-line
/// inline source. Returns the scenario and the directory its tests run in.
pub fn resolve(reference: &str, base_dir: &Path) -> Result<(ScenarioRef, PathBuf)> {
    if let Some(info) = get_scenario(reference) {
        return Ok((ScenarioRef::Registered(info), base_dir.to_path_buf()));
    }

    if reference.contains('\n') {
        return Ok((ScenarioRef::Inline(reference.to_string()), base_dir.to_path_buf()));
    }

    let candidate = base_dir.join(reference);
    if candidate.is_file() {
        let workdir = candidate
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base_dir.to_path_buf());
        return Ok((ScenarioRef::File(candidate), workdir));
    }

    Err(Error::UnknownScenario(reference.to_string()))
}
