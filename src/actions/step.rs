//! Declarative pipeline steps
//!
//! Steps are what scenario scripts are written in. Each one names an action
//! and carries its options:
//! ```yaml
//! - action: expect_content_to_include
//!   text: "<status>ok</status>"
//! ```

use std::sync::Arc;

use serde::Deserialize;

use super::expect::{
    ContentIncludeOptions, ContentMatchOptions, ExpectContentToInclude, ExpectContentToMatch,
    ExpectStatusCode, StatusCodeOptions,
};
use super::listen::{Listen, ListenOptions};
use super::load::{Load, LoadOptions};
use super::render::{Parse, ParseOptions, Render, RenderOptions};
use super::request::{Request, RequestOptions};
use super::serial::{Pipeline, SerialOptions, Wait, WaitOptions};
use super::xsd::{ExpectToMatchXsd, ValidateXml, ValidateXmlOptions, XsdOptions};
use super::Action;
use crate::common::Result;

/// A single step in a scenario script
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Read a file into the content
    Load(LoadOptions),
    /// Render a template with the context data
    Render(RenderOptions),
    /// Reinterpret the content as JSON, XML or text
    Parse(ParseOptions),
    /// Send an HTTP request
    Request(RequestOptions),
    /// Accept one HTTP request while a trigger pipeline runs
    Listen(ListenOptions),
    ExpectStatusCode(StatusCodeOptions),
    ExpectContentToInclude(ContentIncludeOptions),
    ExpectContentToMatch(ContentMatchOptions),
    /// Validate the content against an XSD
    ExpectToMatchXsd(XsdOptions),
    /// Validate an inline document against an inline XSD
    ValidateXml(ValidateXmlOptions),
    /// Run nested steps in order
    Serial(SerialOptions),
    Wait(WaitOptions),
}

impl Step {
    /// Check the options and build the action
    pub fn build(self) -> Result<Arc<dyn Action>> {
        Ok(match self {
            Step::Load(options) => Arc::new(Load::new(options)?),
            Step::Render(options) => Arc::new(Render::new(options)?),
            Step::Parse(options) => Arc::new(Parse::new(options)),
            Step::Request(options) => Arc::new(Request::new(options)?),
            Step::Listen(options) => Arc::new(Listen::new(options)?),
            Step::ExpectStatusCode(options) => Arc::new(ExpectStatusCode::new(options)?),
            Step::ExpectContentToInclude(options) => Arc::new(ExpectContentToInclude::new(options)),
            Step::ExpectContentToMatch(options) => Arc::new(ExpectContentToMatch::new(options)?),
            Step::ExpectToMatchXsd(options) => Arc::new(ExpectToMatchXsd::new(options)?),
            Step::ValidateXml(options) => Arc::new(ValidateXml::new(options)),
            Step::Serial(options) => Arc::new(Pipeline::from_steps(options.steps)?),
            Step::Wait(options) => Arc::new(Wait::new(options)),
        })
    }
}

/// Parse a YAML step list
pub fn parse_steps(source: &str) -> Result<Vec<Step>> {
    Ok(serde_yaml::from_str(source)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;

    #[test]
    fn test_parse_tagged_steps() {
        let steps = parse_steps(
            r#"
- action: load
  path: body.xml
- action: request
  url: http://localhost:8080/
  method: POST
  headers:
    X-Trace: "1"
- action: expect_status_code
  code: 200
- action: serial
  steps:
    - action: wait
      ms: 5
"#,
        )
        .unwrap();
        assert_eq!(steps.len(), 4);
        assert!(matches!(&steps[0], Step::Load(o) if o.path.to_str() == Some("body.xml")));
        assert!(matches!(&steps[3], Step::Serial(o) if o.steps.len() == 1));
        assert!(Pipeline::from_steps(steps).is_ok());
    }

    #[test]
    fn test_unknown_action_and_field() {
        assert!(parse_steps("- action: teleport\n").is_err());
        assert!(parse_steps("- action: wait\n  ms: 1\n  jitter: 2\n").is_err());
    }

    #[test]
    fn test_invalid_options_fail_at_build() {
        let steps = parse_steps("- action: request\n  url: ftp://example.com\n").unwrap();
        let err = Pipeline::from_steps(steps).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("request"));
    }
}
