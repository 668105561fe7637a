//! Expectations on the context
//!
//! Expectations leave the context untouched and add nothing to the trail.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use super::{Action, ActionContext};
use crate::common::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusCodeOptions {
    pub code: u16,
}

/// The last response had this status
#[derive(Debug, Clone)]
pub struct ExpectStatusCode {
    code: u16,
}

impl ExpectStatusCode {
    pub fn new(options: StatusCodeOptions) -> Result<Self> {
        if !(100..=999).contains(&options.code) {
            return Err(Error::invalid_parameter(
                "expect_status_code",
                format!("\"code\" must be a valid status code, got {}", options.code),
            ));
        }
        Ok(Self { code: options.code })
    }
}

#[async_trait]
impl Action for ExpectStatusCode {
    async fn apply(&self, ctx: ActionContext) -> Result<ActionContext> {
        match ctx.code {
            None => Err(Error::Assertion(ctx.trail(
                "unexpected status code: expected context to have property 'code'",
            ))),
            Some(code) if code != self.code => Err(Error::Assertion(ctx.trail(format!(
                "unexpected status code: expected {} to equal {}",
                code, self.code
            )))),
            Some(_) => Ok(ctx),
        }
    }
}

fn content_text(ctx: &ActionContext) -> Result<String> {
    ctx.content
        .as_ref()
        .map(|content| content.as_text().into_owned())
        .ok_or_else(|| {
            Error::Assertion(
                ctx.trail("unexpected content: expected context to have property 'content'"),
            )
        })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentIncludeOptions {
    pub text: String,
}

/// The content contains a substring
#[derive(Debug, Clone)]
pub struct ExpectContentToInclude {
    text: String,
}

impl ExpectContentToInclude {
    pub fn new(options: ContentIncludeOptions) -> Self {
        Self { text: options.text }
    }
}

#[async_trait]
impl Action for ExpectContentToInclude {
    async fn apply(&self, ctx: ActionContext) -> Result<ActionContext> {
        let content = content_text(&ctx)?;
        if !content.contains(&self.text) {
            return Err(Error::Assertion(ctx.trail(format!(
                "unexpected content: expected '{}' to include '{}'",
                content, self.text
            ))));
        }
        Ok(ctx)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentMatchOptions {
    pub pattern: String,
}

/// The content matches a regular expression
#[derive(Debug, Clone)]
pub struct ExpectContentToMatch {
    pattern: Regex,
}

impl ExpectContentToMatch {
    pub fn new(options: ContentMatchOptions) -> Result<Self> {
        let pattern = Regex::new(&options.pattern).map_err(|e| {
            Error::invalid_parameter("expect_content_to_match", format!("\"pattern\" {}", e))
        })?;
        Ok(Self { pattern })
    }
}

#[async_trait]
impl Action for ExpectContentToMatch {
    async fn apply(&self, ctx: ActionContext) -> Result<ActionContext> {
        let content = content_text(&ctx)?;
        if !self.pattern.is_match(&content) {
            return Err(Error::Assertion(ctx.trail(format!(
                "unexpected content: expected '{}' to match /{}/",
                content,
                self.pattern.as_str()
            ))));
        }
        Ok(ctx)
    }
}
