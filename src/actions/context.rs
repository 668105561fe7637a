//! The context threaded through an action pipeline

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::common::Result;
use crate::xml::XmlDocument;

/// Payload carried between actions
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Json(Value),
    Xml(XmlDocument),
}

impl Content {
    /// Parse a body according to its content type
    ///
    /// `*/json` and `*+json` parse as JSON, `*/xml` and `*+xml` as XML, the
    /// rest stays text. Empty bodies are always text.
    pub fn parse(body: String, content_type: Option<&str>) -> Result<Self> {
        if body.is_empty() {
            return Ok(Content::Text(body));
        }
        let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
        if content_type.contains("/xml") || content_type.contains("+xml") {
            Ok(Content::Xml(XmlDocument::parse(body)?))
        } else if content_type.contains("/json") || content_type.contains("+json") {
            Ok(Content::Json(serde_json::from_str(&body)?))
        } else {
            Ok(Content::Text(body))
        }
    }

    /// Text form, as it would be sent on the wire
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Content::Text(text) => Cow::Borrowed(text),
            Content::Json(value) => Cow::Owned(value.to_string()),
            Content::Xml(doc) => Cow::Borrowed(doc.as_str()),
        }
    }

    /// Default content type when sent as a body
    pub fn content_type(&self) -> &'static str {
        match self {
            Content::Text(_) => "text/plain",
            Content::Json(_) => "application/json",
            Content::Xml(_) => "application/xml",
        }
    }

    /// JSON view, used for script results
    pub fn to_value(&self) -> Value {
        match self {
            Content::Json(value) => value.clone(),
            other => Value::String(other.as_text().into_owned()),
        }
    }
}

/// Mutable state owned by one pipeline run
///
/// Actions read and replace fields; the stack only grows and records what
/// each step did, for error messages.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    pub content: Option<Content>,
    /// HTTP status code of the last response
    pub code: Option<u16>,
    /// Headers of the last response or received request, names lowercased
    pub headers: Option<BTreeMap<String, String>>,
    /// File the content was loaded from
    pub path: Option<PathBuf>,
    /// Template data and free-form values
    pub data: Map<String, Value>,
    stack: Vec<String>,
}

impl ActionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Map<String, Value>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Context for a nested pipeline: same data and trail, nothing else
    pub fn child(&self) -> Self {
        Self {
            data: self.data.clone(),
            stack: self.stack.clone(),
            ..Self::default()
        }
    }

    /// Record a step
    pub fn push(&mut self, step: impl Into<String>) {
        self.stack.push(step.into());
    }

    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    /// Prefix `detail` with the recorded steps: "when A then B: detail"
    pub fn trail(&self, detail: impl AsRef<str>) -> String {
        if self.stack.is_empty() {
            return detail.as_ref().to_string();
        }
        format!("when {}: {}", self.stack.join(" then "), detail.as_ref())
    }

    /// A context field as JSON
    ///
    /// `content`, `code`, `headers`, `path`, `data` and `stack` name the
    /// fields; any other name is looked up in `data`.
    pub fn field(&self, name: &str) -> Value {
        match name {
            "content" => self.content.as_ref().map_or(Value::Null, Content::to_value),
            "code" => self.code.map_or(Value::Null, Value::from),
            "headers" => self.headers.as_ref().map_or(Value::Null, |headers| {
                Value::Object(
                    headers
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                )
            }),
            "path" => self
                .path
                .as_ref()
                .map_or(Value::Null, |p| Value::String(p.display().to_string())),
            "data" => Value::Object(self.data.clone()),
            "stack" => Value::from(self.stack.clone()),
            other => self.data.get(other).cloned().unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trail() {
        let mut ctx = ActionContext::new();
        assert_eq!(ctx.trail("boom"), "boom");
        ctx.push("load file body.json");
        ctx.push("request http://localhost/");
        assert_eq!(
            ctx.trail("unexpected status code"),
            "when load file body.json then request http://localhost/: unexpected status code"
        );
    }

    #[test]
    fn test_child_keeps_data_and_trail_only() {
        let mut ctx = ActionContext::with_data(json!({"a": 1}).as_object().cloned().unwrap());
        ctx.code = Some(200);
        ctx.push("step");
        let child = ctx.child();
        assert_eq!(child.data["a"], 1);
        assert_eq!(child.stack(), ["step"]);
        assert!(child.code.is_none());
    }

    #[test]
    fn test_content_parse_by_type() {
        let json = Content::parse("{\"a\":1}".into(), Some("application/json; charset=utf-8")).unwrap();
        assert_eq!(json, Content::Json(json!({"a": 1})));

        let xml = Content::parse("<a/>".into(), Some("application/soap+xml")).unwrap();
        assert!(matches!(xml, Content::Xml(_)));

        let text = Content::parse("<a/>".into(), Some("text/html")).unwrap();
        assert_eq!(text, Content::Text("<a/>".into()));

        assert!(Content::parse("{oops".into(), Some("application/json")).is_err());
        assert_eq!(
            Content::parse(String::new(), Some("application/json")).unwrap(),
            Content::Text(String::new())
        );
    }

    #[test]
    fn test_field_lookup() {
        let mut ctx = ActionContext::with_data(json!({"token": "t"}).as_object().cloned().unwrap());
        ctx.code = Some(201);
        ctx.content = Some(Content::Json(json!([1])));
        assert_eq!(ctx.field("code"), json!(201));
        assert_eq!(ctx.field("content"), json!([1]));
        assert_eq!(ctx.field("token"), json!("t"));
        assert_eq!(ctx.field("headers"), Value::Null);
    }
}
