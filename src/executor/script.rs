//! Scenario scripts
//!
//! A script is the YAML document a test generates and a worker runs:
//! ```yaml
//! data: {"host": "localhost"}
//! result: code
//! steps:
//!   - action: request
//!     url: http://localhost:8080/
//!   - action: expect_status_code
//!     code: 200
//! ```
//! Exactly one of `return`, `throw`, `panic` or `steps` gives the body.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::actions::{self, Action, ActionContext, Body, Pipeline, Step};
use crate::common::{Error, Result};

/// How a `steps` body reports its outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    Future,
    /// Through a completion handle called from a spawned task
    Callback,
}

fn default_result() -> String {
    "content".to_string()
}

/// Keeps an explicit `null` apart from a missing key
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Seed for the context data
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub style: Style,
    /// Context field returned on success
    #[serde(default = "default_result")]
    pub result: String,
    #[serde(rename = "return", default, deserialize_with = "present")]
    pub value: Option<Value>,
    pub throw: Option<String>,
    pub panic: Option<String>,
    pub steps: Option<Vec<Step>>,
}

enum Kind {
    Return(Value),
    Throw(String),
    Panic(String),
    Steps(Vec<Step>),
}

impl Script {
    /// Parse script source; malformed YAML is a syntax error with its position
    pub fn parse(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).map_err(|e| Error::Syntax(e.to_string()))
    }

    fn kind(self) -> Result<(Kind, Option<Map<String, Value>>, Style, String)> {
        let mut kinds = Vec::new();
        if let Some(value) = self.value {
            kinds.push(Kind::Return(value));
        }
        if let Some(message) = self.throw {
            kinds.push(Kind::Throw(message));
        }
        if let Some(message) = self.panic {
            kinds.push(Kind::Panic(message));
        }
        if let Some(steps) = self.steps {
            kinds.push(Kind::Steps(steps));
        }
        if kinds.len() != 1 {
            return Err(Error::Syntax(
                "a script needs exactly one of 'return', 'throw', 'panic' or 'steps'".to_string(),
            ));
        }
        let kind = kinds.remove(0);
        Ok((kind, self.data, self.style, self.result))
    }

    /// Build the body the worker settles
    ///
    /// Steps are checked here, so invalid options fail before anything runs.
    pub fn compile(self) -> Result<Body<(), Value>> {
        let (kind, data, style, result) = self.kind()?;
        Ok(match kind {
            Kind::Return(value) => Body::value(move |_| Ok(value)),
            Kind::Throw(message) => Body::value(move |_| Err(Error::Thrown(message))),
            Kind::Panic(message) => Body::value(move |_| std::panic::panic_any(message)),
            Kind::Steps(steps) => {
                let pipeline = Pipeline::from_steps(steps)?;
                match style {
                    Style::Future => {
                        Body::future(move |_| evaluate(pipeline, data, result))
                    }
                    Style::Callback => Body::callback(move |_, done| {
                        tokio::spawn(async move {
                            done.call(evaluate(pipeline, data, result).await);
                        });
                    }),
                }
            }
        })
    }
}

async fn evaluate(
    pipeline: Pipeline,
    data: Option<Map<String, Value>>,
    result: String,
) -> Result<Value> {
    let body = Body::future(move |ctx: ActionContext| async move { pipeline.apply(ctx).await });
    let ctx = actions::run(body, data).await?;
    Ok(ctx.field(&result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;
    use serde_json::json;

    async fn settle(source: &str) -> Result<Value> {
        Script::parse(source)?.compile()?.settle(()).await
    }

    #[tokio::test]
    async fn test_return_and_throw() {
        assert_eq!(settle("return: 3").await.unwrap(), json!(3));
        assert_eq!(settle("return: ~").await.unwrap(), Value::Null);

        let err = settle("throw: nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.to_string(), "nope");
    }

    #[tokio::test]
    async fn test_steps_future_and_callback() {
        let source = r#"
data: {"name": "ada"}
steps:
  - action: render
    template: "hi {{ name }}"
"#;
        assert_eq!(settle(source).await.unwrap(), json!("hi ada"));

        let callback = format!("style: callback\nresult: stack\n{}", source);
        assert_eq!(
            settle(&callback).await.unwrap(),
            json!(["render template inline"])
        );
    }

    #[tokio::test]
    async fn test_syntax_errors() {
        let err = settle("steps: [\n").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(err.to_string().contains("line"));

        let err = settle("return: 1\nthrow: x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);

        assert!(settle("data: {}").await.is_err());
        assert!(settle("bogus: 1").await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_step_fails_at_compile() {
        let script = Script::parse("steps:\n  - action: expect_status_code\n    code: 7\n").unwrap();
        let err = script.compile().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
