//! Bodies for outgoing requests and listener responses

use serde_json::Value;

use super::serial::Pipeline;
use super::step::Step;
use super::{Action, ActionContext, Content};
use crate::common::{Error, Result};

/// Body of a request or response
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    None,
    /// Fixed content; strings are sent as text, anything else as JSON
    Content(Content),
    /// Produced by a pipeline run on a child context at send time
    Deferred(Pipeline),
}

impl Payload {
    /// Build from the `body` / `body_from` option pair
    pub fn from_options(
        action: &str,
        body: Option<Value>,
        body_from: Option<Vec<Step>>,
    ) -> Result<Self> {
        match (body, body_from) {
            (Some(_), Some(_)) => Err(Error::invalid_parameter(
                action,
                "\"body\" conflicts with forbidden peer \"body_from\"",
            )),
            (Some(Value::String(text)), None) => Ok(Payload::Content(Content::Text(text))),
            (Some(value), None) => Ok(Payload::Content(Content::Json(value))),
            (None, Some(steps)) => Ok(Payload::Deferred(Pipeline::from_steps(steps)?)),
            (None, None) => Ok(Payload::None),
        }
    }

    /// The content to send, running the deferred pipeline if there is one
    pub async fn resolve(&self, ctx: &ActionContext) -> Result<Option<Content>> {
        match self {
            Payload::None => Ok(None),
            Payload::Content(content) => Ok(Some(content.clone())),
            Payload::Deferred(pipeline) => Ok(pipeline.apply(ctx.child()).await?.content),
        }
    }
}
