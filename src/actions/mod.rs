//! Composable actions
//!
//! An [`Action`] takes the [`ActionContext`] produced by the previous step and
//! returns the context for the next one. Actions check their parameters when
//! they are built, so a bad pipeline fails before doing any I/O.
//!
//! Pipelines are usually written as [`Step`] lists in scenario scripts:
//! ```yaml
//! - action: load
//!   path: body.json
//! - action: request
//!   url: http://localhost:8080/users
//!   method: POST
//! - action: expect_status_code
//!   code: 201
//! ```

pub mod body;
pub mod context;
mod expect;
mod listen;
mod load;
mod payload;
mod render;
mod request;
mod serial;
pub mod step;
mod xsd;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::common::Result;

pub use body::{run, Body, Done};
pub use context::{ActionContext, Content};
pub use expect::{
    ContentIncludeOptions, ContentMatchOptions, ExpectContentToInclude, ExpectContentToMatch,
    ExpectStatusCode, StatusCodeOptions,
};
pub use listen::{Listen, ListenOptions};
pub use load::{Encoding, Load, LoadOptions};
pub use payload::Payload;
pub use render::{Parse, ParseFormat, ParseOptions, Render, RenderOptions};
pub use request::{Method, Request, RequestOptions};
pub use serial::{run_serial, Pipeline, SerialOptions, Wait, WaitOptions};
pub use step::Step;
pub use xsd::{validate_xml, ExpectToMatchXsd, ValidateXml, ValidateXmlOptions, XsdOptions};

/// One step of a pipeline
#[async_trait]
pub trait Action: Send + Sync + fmt::Debug {
    async fn apply(&self, ctx: ActionContext) -> Result<ActionContext>;
}

/// File name for step descriptions
fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
