//! The `load` action

use std::path::PathBuf;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use tracing::debug;

use super::{basename, Action, ActionContext, Content};
use crate::common::{Error, Result};

/// How file bytes become text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    #[serde(alias = "utf-8")]
    Utf8,
    /// 7-bit: the high bit of every byte is dropped
    Ascii,
    /// One char per byte
    #[serde(alias = "binary")]
    Latin1,
    Base64,
    Hex,
}

impl Encoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Ascii => bytes.iter().map(|b| char::from(b & 0x7f)).collect(),
            Encoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Encoding::Base64 => STANDARD.encode(bytes),
            Encoding::Hex => hex::encode(bytes),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadOptions {
    pub path: PathBuf,
    #[serde(default)]
    pub encoding: Encoding,
}

/// Read a file into the content, remembering where it came from
#[derive(Debug, Clone)]
pub struct Load {
    path: PathBuf,
    encoding: Encoding,
}

impl Load {
    pub fn new(options: LoadOptions) -> Result<Self> {
        if options.path.as_os_str().is_empty() {
            return Err(Error::invalid_parameter("load", "\"path\" is not allowed to be empty"));
        }
        Ok(Self {
            path: options.path,
            encoding: options.encoding,
        })
    }
}

#[async_trait]
impl Action for Load {
    async fn apply(&self, mut ctx: ActionContext) -> Result<ActionContext> {
        ctx.push(format!("load file {}", basename(&self.path)));
        debug!(path = %self.path.display(), encoding = ?self.encoding, "Loading file");

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::file_read(&self.path, &e))?;
        ctx.content = Some(Content::Text(self.encoding.decode(&bytes)));
        ctx.path = Some(self.path.clone());
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;

    #[test]
    fn test_decodings() {
        let bytes = [0x68, 0x69, 0xe9];
        assert_eq!(Encoding::Latin1.decode(&bytes), "hié");
        assert_eq!(Encoding::Ascii.decode(&bytes), "hii");
        assert_eq!(Encoding::Hex.decode(&bytes), "6869e9");
        assert_eq!(Encoding::Base64.decode(b"hi"), "aGk=");
        assert_eq!(Encoding::Utf8.decode("é".as_bytes()), "é");
    }

    #[tokio::test]
    async fn test_load_sets_content_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.xml");
        std::fs::write(&path, "<a/>").unwrap();

        let load = Load::new(LoadOptions {
            path: path.clone(),
            encoding: Encoding::Utf8,
        })
        .unwrap();
        let ctx = load.apply(ActionContext::new()).await.unwrap();
        assert_eq!(ctx.content, Some(Content::Text("<a/>".into())));
        assert_eq!(ctx.path.as_deref(), Some(path.as_path()));
        assert_eq!(ctx.stack(), ["load file body.xml"]);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let load = Load::new(LoadOptions {
            path: PathBuf::from("does/not/exist.txt"),
            encoding: Encoding::default(),
        })
        .unwrap();
        let err = load.apply(ActionContext::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("exist.txt"));
    }

    #[test]
    fn test_empty_path_rejected() {
        let options: LoadOptions = serde_yaml::from_str("path: ''").unwrap();
        assert!(Load::new(options).is_err());
    }
}
