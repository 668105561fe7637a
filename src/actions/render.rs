//! Content transforms: `render` and `parse`

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::serial::Pipeline;
use super::step::Step;
use super::{basename, Action, ActionContext, Content};
use crate::common::{Error, Result};
use crate::engine::template::{self, Mode};
use crate::xml::XmlDocument;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderOptions {
    /// Inline template source
    pub template: Option<String>,
    /// Steps producing the template, usually a `load`
    pub template_from: Option<Vec<Step>>,
    /// Variables; defaults to the context data
    pub data: Option<Map<String, Value>>,
}

#[derive(Debug, Clone)]
enum TemplateSource {
    /// The current content
    Context,
    Inline(String),
    Deferred(Pipeline),
}

/// Render a template into the content
#[derive(Debug, Clone)]
pub struct Render {
    source: TemplateSource,
    data: Option<Map<String, Value>>,
}

impl Render {
    pub fn new(options: RenderOptions) -> Result<Self> {
        let source = match (options.template, options.template_from) {
            (Some(_), Some(_)) => {
                return Err(Error::invalid_parameter(
                    "render",
                    "\"template\" conflicts with forbidden peer \"template_from\"",
                ))
            }
            (Some(template), None) => TemplateSource::Inline(template),
            (None, Some(steps)) => TemplateSource::Deferred(Pipeline::from_steps(steps)?),
            (None, None) => TemplateSource::Context,
        };
        Ok(Self {
            source,
            data: options.data,
        })
    }

    async fn template(&self, ctx: &ActionContext) -> Result<(String, Option<PathBuf>)> {
        match &self.source {
            TemplateSource::Inline(source) => Ok((source.clone(), None)),
            TemplateSource::Context => {
                let source = text_of(ctx, ctx.content.as_ref())?;
                Ok((source, ctx.path.clone()))
            }
            TemplateSource::Deferred(pipeline) => {
                let produced = pipeline.apply(ctx.child()).await?;
                let source = text_of(&produced, produced.content.as_ref())?;
                Ok((source, produced.path))
            }
        }
    }
}

fn text_of(ctx: &ActionContext, content: Option<&Content>) -> Result<String> {
    content.map(|c| c.as_text().into_owned()).ok_or_else(|| {
        Error::invalid_parameter("render", ctx.trail("no template and no content to render"))
    })
}

#[async_trait]
impl Action for Render {
    async fn apply(&self, mut ctx: ActionContext) -> Result<ActionContext> {
        let (source, origin) = self.template(&ctx).await?;
        let name = origin.as_deref().map_or_else(|| "inline".to_string(), basename);
        ctx.push(format!("render template {}", name));
        debug!(template = %name, "Rendering template");

        let data = self.data.as_ref().unwrap_or(&ctx.data);
        let rendered = template::render(&source, data, Mode::Text).map_err(|e| match e {
            Error::Template(message) => Error::Template(ctx.trail(message)),
            other => other,
        })?;
        ctx.content = Some(Content::Text(rendered));
        Ok(ctx)
    }
}

/// Target representation for `parse`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseFormat {
    Json,
    Xml,
    Text,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParseOptions {
    pub format: ParseFormat,
}

/// Reinterpret the current content
#[derive(Debug, Clone)]
pub struct Parse {
    format: ParseFormat,
}

impl Parse {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            format: options.format,
        }
    }
}

#[async_trait]
impl Action for Parse {
    async fn apply(&self, mut ctx: ActionContext) -> Result<ActionContext> {
        let Some(content) = ctx.content.take() else {
            return Err(Error::Assertion(
                ctx.trail("cannot parse: expected context to have property 'content'"),
            ));
        };
        let text = content.as_text().into_owned();
        let parsed = match self.format {
            ParseFormat::Text => Content::Text(text),
            ParseFormat::Json => Content::Json(serde_json::from_str(&text)?),
            ParseFormat::Xml => match content {
                Content::Xml(doc) => Content::Xml(doc),
                _ => Content::Xml(XmlDocument::parse(text)?),
            },
        };
        ctx.content = Some(parsed);
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_render_inline_with_context_data() {
        let render = Render::new(RenderOptions {
            template: Some("<user>{{ user.name }}</user>".into()),
            ..Default::default()
        })
        .unwrap();
        let ctx = ActionContext::with_data(data(json!({"user": {"name": "ada"}})));
        let ctx = render.apply(ctx).await.unwrap();
        assert_eq!(ctx.content, Some(Content::Text("<user>ada</user>".into())));
        assert_eq!(ctx.stack(), ["render template inline"]);
    }

    #[tokio::test]
    async fn test_render_loaded_template_with_explicit_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.tpl");
        std::fs::write(&path, "id={{ id }}").unwrap();

        let steps = crate::actions::step::parse_steps(&format!(
            "- action: load\n  path: '{}'\n",
            path.display()
        ))
        .unwrap();
        let render = Render::new(RenderOptions {
            template_from: Some(steps),
            data: Some(data(json!({"id": 7}))),
            ..Default::default()
        })
        .unwrap();
        let ctx = render.apply(ActionContext::new()).await.unwrap();
        assert_eq!(ctx.content, Some(Content::Text("id=7".into())));
        assert_eq!(ctx.stack(), ["render template body.tpl"]);
    }

    #[tokio::test]
    async fn test_render_errors() {
        let render = Render::new(RenderOptions::default()).unwrap();
        assert!(render.apply(ActionContext::new()).await.is_err());

        let render = Render::new(RenderOptions {
            template: Some("{{ missing }}".into()),
            ..Default::default()
        })
        .unwrap();
        let err = render.apply(ActionContext::new()).await.unwrap_err();
        assert!(err.to_string().starts_with("Template error: when render template inline:"));

        assert!(Render::new(RenderOptions {
            template: Some("x".into()),
            template_from: Some(Vec::new()),
            data: None,
        })
        .is_err());
    }

    #[tokio::test]
    async fn test_parse_formats() {
        let mut ctx = ActionContext::new();
        ctx.content = Some(Content::Text("{\"ok\":true}".into()));
        let ctx = Parse::new(ParseOptions { format: ParseFormat::Json })
            .apply(ctx)
            .await
            .unwrap();
        assert_eq!(ctx.content, Some(Content::Json(json!({"ok": true}))));

        let ctx = Parse::new(ParseOptions { format: ParseFormat::Xml })
            .apply(ctx)
            .await;
        assert!(ctx.is_err());
    }
}
