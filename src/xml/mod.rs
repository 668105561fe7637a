//! Parsed XML documents
//!
//! Documents are parsed with `roxmltree` and copied into an owned element tree
//! so they can live in an action context and cross `await` points.

pub mod schema;

use std::fmt;

use crate::common::{Error, Result};

pub use schema::XmlSchema;

/// An owned, parsed XML document
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    source: String,
    root: Element,
}

/// One element of a parsed document
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Local name, without prefix
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Element>,
    /// Concatenated direct text content
    pub text: String,
    /// 1-based line of the start tag
    pub line: u32,
}

/// An attribute of an element
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Local name, without prefix
    pub name: String,
    pub namespace: Option<String>,
    pub value: String,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// `{namespace}name`, or the bare name outside any namespace
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{{{}}}{}", namespace, self.name),
            None => self.name.clone(),
        }
    }

    fn from_node(doc: &roxmltree::Document, node: roxmltree::Node) -> Self {
        let text = node
            .children()
            .filter(|child| child.is_text())
            .filter_map(|child| child.text())
            .collect::<String>();

        Self {
            name: node.tag_name().name().to_string(),
            namespace: node.tag_name().namespace().map(str::to_string),
            attributes: node
                .attributes()
                .map(|attr| Attribute {
                    name: attr.name().to_string(),
                    namespace: attr.namespace().map(str::to_string),
                    value: attr.value().to_string(),
                })
                .collect(),
            children: node
                .children()
                .filter(|child| child.is_element())
                .map(|child| Element::from_node(doc, child))
                .collect(),
            text,
            line: doc.text_pos_at(node.range().start).row,
        }
    }
}

impl XmlDocument {
    /// Parse XML text
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let root = {
            let doc = roxmltree::Document::parse(&source).map_err(|e| Error::Xml(e.to_string()))?;
            Element::from_node(&doc, doc.root_element())
        };
        Ok(Self { source, root })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The original document text
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;

    #[test]
    fn test_parse_builds_tree() {
        let doc = XmlDocument::parse(
            "<?xml version=\"1.0\"?>\n<user id=\"7\">\n  <name>ada</name>\n  <age>36</age>\n</user>",
        )
        .unwrap();
        let root = doc.root();
        assert_eq!(root.name, "user");
        assert_eq!(root.attribute("id"), Some("7"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].text, "ada");
        assert_eq!(root.children[1].line, 4);
        assert!(doc.to_string().contains("<age>36</age>"));
    }

    #[test]
    fn test_qualified_name() {
        let doc = XmlDocument::parse(r#"<s:status xmlns:s="urn:acme"><code/></s:status>"#).unwrap();
        assert_eq!(doc.root().qualified_name(), "{urn:acme}status");
        assert_eq!(doc.root().children[0].qualified_name(), "code");
    }

    #[test]
    fn test_parse_error_is_positional() {
        let err = XmlDocument::parse("<user><name></user>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("1:"));
    }
}
