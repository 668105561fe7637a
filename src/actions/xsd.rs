//! XML Schema validation actions

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::serial::Pipeline;
use super::step::Step;
use super::{Action, ActionContext, Content};
use crate::common::{Error, Result};
use crate::xml::schema::Diagnostic;
use crate::xml::{XmlDocument, XmlSchema};

fn violations(diagnostics: &[Diagnostic]) -> String {
    let lines: Vec<String> = diagnostics.iter().map(ToString::to_string).collect();
    format!("Invalid XML:\n{}", lines.join("\n"))
}

/// Parse and validate a document against a schema
///
/// Parse failures come back as [`Error::Xml`] or [`Error::Xsd`]; violations
/// as one [`Error::Assertion`] listing every diagnostic.
pub fn validate_xml(xml: &str, xsd: &str, base_dir: &Path) -> Result<(XmlDocument, XmlSchema)> {
    let schema = XmlSchema::parse(xsd, base_dir)?;
    let doc = XmlDocument::parse(xml)?;
    let diagnostics = schema.validate(&doc);
    if !diagnostics.is_empty() {
        return Err(Error::Assertion(violations(&diagnostics)));
    }
    Ok((doc, schema))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct XsdOptions {
    /// Inline schema source
    pub xsd: Option<String>,
    /// Steps producing the schema, usually a `load`
    pub xsd_from: Option<Vec<Step>>,
}

#[derive(Debug, Clone)]
enum SchemaSource {
    Inline(String),
    Deferred(Pipeline),
}

/// The content is a document valid against the schema
#[derive(Debug, Clone)]
pub struct ExpectToMatchXsd {
    schema: SchemaSource,
}

impl ExpectToMatchXsd {
    pub fn new(options: XsdOptions) -> Result<Self> {
        let schema = match (options.xsd, options.xsd_from) {
            (Some(xsd), None) => SchemaSource::Inline(xsd),
            (None, Some(steps)) => SchemaSource::Deferred(Pipeline::from_steps(steps)?),
            (Some(_), Some(_)) => {
                return Err(Error::invalid_parameter(
                    "expect_to_match_xsd",
                    "\"xsd\" conflicts with forbidden peer \"xsd_from\"",
                ))
            }
            (None, None) => {
                return Err(Error::invalid_parameter(
                    "expect_to_match_xsd",
                    "\"xsd\" or \"xsd_from\" is required",
                ))
            }
        };
        Ok(Self { schema })
    }

    async fn schema_source(&self, ctx: &ActionContext) -> Result<(String, Option<PathBuf>)> {
        match &self.schema {
            SchemaSource::Inline(xsd) => Ok((xsd.clone(), None)),
            SchemaSource::Deferred(pipeline) => {
                let produced = pipeline.apply(ctx.child()).await?;
                let xsd = produced
                    .content
                    .as_ref()
                    .map(|content| content.as_text().into_owned())
                    .ok_or_else(|| {
                        Error::invalid_parameter(
                            "expect_to_match_xsd",
                            ctx.trail("\"xsd_from\" produced no content"),
                        )
                    })?;
                Ok((xsd, produced.path))
            }
        }
    }
}

/// Directory includes resolve against: the content's file, then the schema's
fn base_dir(ctx: &ActionContext, schema_path: Option<&Path>) -> PathBuf {
    ctx.path
        .as_deref()
        .or(schema_path)
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[async_trait]
impl Action for ExpectToMatchXsd {
    async fn apply(&self, mut ctx: ActionContext) -> Result<ActionContext> {
        let doc = match ctx.content.take() {
            Some(Content::Xml(doc)) => doc,
            Some(Content::Text(text)) => XmlDocument::parse(text)?,
            Some(Content::Json(_)) => {
                return Err(Error::Assertion(
                    ctx.trail("invalid XML: expected markup content, got JSON"),
                ))
            }
            None => {
                return Err(Error::Assertion(
                    ctx.trail("invalid XML: expected context to have property 'content'"),
                ))
            }
        };

        let (xsd, schema_path) = self.schema_source(&ctx).await?;
        let base = base_dir(&ctx, schema_path.as_deref());
        debug!(base_dir = %base.display(), "Validating content against XSD");
        let schema = XmlSchema::parse(&xsd, &base)?;

        let diagnostics = schema.validate(&doc);
        if !diagnostics.is_empty() {
            return Err(Error::Assertion(ctx.trail(violations(&diagnostics))));
        }
        ctx.content = Some(Content::Xml(doc));
        Ok(ctx)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidateXmlOptions {
    pub xml: String,
    pub xsd: String,
}

/// Validate an inline document; it becomes the content
#[derive(Debug, Clone)]
pub struct ValidateXml {
    xml: String,
    xsd: String,
}

impl ValidateXml {
    pub fn new(options: ValidateXmlOptions) -> Self {
        Self {
            xml: options.xml,
            xsd: options.xsd,
        }
    }
}

#[async_trait]
impl Action for ValidateXml {
    async fn apply(&self, mut ctx: ActionContext) -> Result<ActionContext> {
        let base = base_dir(&ctx, None);
        let (doc, _) = validate_xml(&self.xml, &self.xsd, &base).map_err(|e| match e {
            Error::Assertion(message) => Error::Assertion(ctx.trail(message)),
            other => other,
        })?;
        ctx.content = Some(Content::Xml(doc));
        Ok(ctx)
    }
}
