//! XML Schema (XSD) validation
//!
//! Supports the subset of XSD 1.0 that API contracts commonly use:
//! global and local element declarations (`ref`, `minOccurs`, `maxOccurs`),
//! complex types with `sequence`/`choice`/`all` (nested), named model groups
//! and attribute groups, `any` wildcards, attributes (`use`, `fixed`),
//! `complexContent`/`simpleContent` extension, simple types with restriction
//! facets or `list`, the common built-in types and `include`/`import`
//! resolved relative to a base directory.
//!
//! Components are keyed by expanded name (`{namespace}local`). Global
//! declarations live in the schema's `targetNamespace`; local elements and
//! attributes follow `form`, `elementFormDefault` and `attributeFormDefault`.
//! An included schema without a target namespace takes the includer's.
//! Constructs outside the subset are rejected when the schema is parsed.
//!
//! Violations are reported the way libxml2 words them, e.g.
//! `Element 'age': 'abc' is not a valid value of the atomic type 'xs:int'.`

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;

use super::{Attribute, Element, XmlDocument};
use crate::common::{Error, Result};

const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Guard against cyclic type derivation and group references
const MAX_DERIVATION_DEPTH: usize = 32;

/// One validation failure
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: u32,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// A compiled schema
#[derive(Debug, Clone, Default)]
pub struct XmlSchema {
    elements: HashMap<String, ElementDecl>,
    attributes: HashMap<String, AttributeDecl>,
    complex_types: HashMap<String, ComplexType>,
    simple_types: HashMap<String, SimpleType>,
    /// Only needed while loading; references are expanded in place afterwards
    groups: HashMap<String, Particle>,
    attribute_groups: HashMap<String, AttributeGroup>,
}

/// `{namespace}local`, or the bare local name outside any namespace
fn expanded(namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(namespace) => format!("{{{}}}{}", namespace, local),
        None => local.to_string(),
    }
}

#[derive(Debug, Clone)]
struct ElementDecl {
    name: String,
    namespace: Option<String>,
    ty: TypeDef,
    min: u32,
    /// `None` is unbounded
    max: Option<u32>,
}

impl ElementDecl {
    fn key(&self) -> String {
        expanded(self.namespace.as_deref(), &self.name)
    }

    fn matches(&self, el: &Element) -> bool {
        el.name == self.name && el.namespace == self.namespace
    }
}

#[derive(Debug, Clone)]
enum TypeDef {
    Builtin(Builtin),
    /// A named complex or simple type
    Named(String),
    /// Reference to a global element or attribute
    Ref(String),
    Complex(Box<ComplexType>),
    Simple(Box<SimpleType>),
}

#[derive(Debug, Clone, Default)]
struct ComplexType {
    /// Base type of a `complexContent` extension
    base: Option<String>,
    content: Content,
    attributes: Vec<AttributeDecl>,
    /// Attribute group references, expanded into `attributes` after loading
    attribute_groups: Vec<String>,
    any_attribute: bool,
    mixed: bool,
}

#[derive(Debug, Clone, Default)]
enum Content {
    #[default]
    Empty,
    Particle(Particle),
    Simple(TypeDef),
}

#[derive(Debug, Clone)]
struct Particle {
    compositor: Compositor,
    items: Vec<Item>,
    min: u32,
    max: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compositor {
    Sequence,
    Choice,
    All,
}

#[derive(Debug, Clone)]
enum Item {
    Element(ElementDecl),
    Any { min: u32, max: Option<u32> },
    Group(Particle),
    /// Named model group, replaced by a `Group` after loading
    GroupRef { key: String, min: u32, max: Option<u32> },
}

impl Item {
    fn occurs(&self) -> (u32, Option<u32>) {
        match self {
            Item::Element(decl) => (decl.min, decl.max),
            Item::Any { min, max } | Item::GroupRef { min, max, .. } => (*min, *max),
            Item::Group(particle) => (particle.min, particle.max),
        }
    }

    fn describe(&self, out: &mut Vec<String>) {
        match self {
            Item::Element(decl) => out.push(decl.key()),
            Item::Any { .. } => out.push("##any".to_string()),
            Item::Group(particle) => particle.items.iter().for_each(|item| item.describe(out)),
            Item::GroupRef { .. } => {}
        }
    }
}

#[derive(Debug, Clone)]
struct AttributeDecl {
    name: String,
    namespace: Option<String>,
    ty: TypeDef,
    required: bool,
    fixed: Option<String>,
}

impl AttributeDecl {
    fn matches(&self, attr: &Attribute) -> bool {
        attr.name == self.name && attr.namespace == self.namespace
    }
}

#[derive(Debug, Clone, Default)]
struct AttributeGroup {
    attributes: Vec<AttributeDecl>,
    groups: Vec<String>,
    any_attribute: bool,
}

#[derive(Debug, Clone)]
enum SimpleType {
    Restriction { base: TypeDef, facets: Facets },
    List(TypeDef),
}

#[derive(Debug, Clone, Default)]
struct Facets {
    enumeration: Vec<String>,
    patterns: Vec<(String, Regex)>,
    length: Option<usize>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min_inclusive: Option<f64>,
    max_inclusive: Option<f64>,
    min_exclusive: Option<f64>,
    max_exclusive: Option<f64>,
}

/// Built-in simple types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    AnyType,
    AnySimpleType,
    String,
    NormalizedString,
    Token,
    AnyUri,
    Boolean,
    Decimal,
    Integer,
    Long,
    Int,
    Short,
    Byte,
    NonNegativeInteger,
    PositiveInteger,
    NonPositiveInteger,
    NegativeInteger,
    UnsignedLong,
    UnsignedInt,
    UnsignedShort,
    UnsignedByte,
    Double,
    Float,
    Date,
    DateTime,
    Time,
    Name,
    NcName,
    Language,
}

impl Builtin {
    fn from_name(name: &str) -> Option<Self> {
        let builtin = match name {
            "anyType" => Builtin::AnyType,
            "anySimpleType" => Builtin::AnySimpleType,
            "string" => Builtin::String,
            "normalizedString" => Builtin::NormalizedString,
            "token" => Builtin::Token,
            "anyURI" => Builtin::AnyUri,
            "boolean" => Builtin::Boolean,
            "decimal" => Builtin::Decimal,
            "integer" => Builtin::Integer,
            "long" => Builtin::Long,
            "int" => Builtin::Int,
            "short" => Builtin::Short,
            "byte" => Builtin::Byte,
            "nonNegativeInteger" => Builtin::NonNegativeInteger,
            "positiveInteger" => Builtin::PositiveInteger,
            "nonPositiveInteger" => Builtin::NonPositiveInteger,
            "negativeInteger" => Builtin::NegativeInteger,
            "unsignedLong" => Builtin::UnsignedLong,
            "unsignedInt" => Builtin::UnsignedInt,
            "unsignedShort" => Builtin::UnsignedShort,
            "unsignedByte" => Builtin::UnsignedByte,
            "double" => Builtin::Double,
            "float" => Builtin::Float,
            "date" => Builtin::Date,
            "dateTime" => Builtin::DateTime,
            "time" => Builtin::Time,
            "Name" => Builtin::Name,
            "NCName" | "ID" | "IDREF" => Builtin::NcName,
            "language" => Builtin::Language,
            _ => return None,
        };
        Some(builtin)
    }

    fn name(self) -> &'static str {
        match self {
            Builtin::AnyType => "anyType",
            Builtin::AnySimpleType => "anySimpleType",
            Builtin::String => "string",
            Builtin::NormalizedString => "normalizedString",
            Builtin::Token => "token",
            Builtin::AnyUri => "anyURI",
            Builtin::Boolean => "boolean",
            Builtin::Decimal => "decimal",
            Builtin::Integer => "integer",
            Builtin::Long => "long",
            Builtin::Int => "int",
            Builtin::Short => "short",
            Builtin::Byte => "byte",
            Builtin::NonNegativeInteger => "nonNegativeInteger",
            Builtin::PositiveInteger => "positiveInteger",
            Builtin::NonPositiveInteger => "nonPositiveInteger",
            Builtin::NegativeInteger => "negativeInteger",
            Builtin::UnsignedLong => "unsignedLong",
            Builtin::UnsignedInt => "unsignedInt",
            Builtin::UnsignedShort => "unsignedShort",
            Builtin::UnsignedByte => "unsignedByte",
            Builtin::Double => "double",
            Builtin::Float => "float",
            Builtin::Date => "date",
            Builtin::DateTime => "dateTime",
            Builtin::Time => "time",
            Builtin::Name => "Name",
            Builtin::NcName => "NCName",
            Builtin::Language => "language",
        }
    }

    /// Integer bounds, for the integer-derived types
    fn integer_range(self) -> Option<(i128, i128)> {
        let range = match self {
            Builtin::Integer => (i128::MIN, i128::MAX),
            Builtin::Long => (i64::MIN as i128, i64::MAX as i128),
            Builtin::Int => (i32::MIN as i128, i32::MAX as i128),
            Builtin::Short => (i16::MIN as i128, i16::MAX as i128),
            Builtin::Byte => (i8::MIN as i128, i8::MAX as i128),
            Builtin::NonNegativeInteger => (0, i128::MAX),
            Builtin::PositiveInteger => (1, i128::MAX),
            Builtin::NonPositiveInteger => (i128::MIN, 0),
            Builtin::NegativeInteger => (i128::MIN, -1),
            Builtin::UnsignedLong => (0, u64::MAX as i128),
            Builtin::UnsignedInt => (0, u32::MAX as i128),
            Builtin::UnsignedShort => (0, u16::MAX as i128),
            Builtin::UnsignedByte => (0, u8::MAX as i128),
            _ => return None,
        };
        Some(range)
    }

    fn accepts(self, value: &str) -> bool {
        if let Some((min, max)) = self.integer_range() {
            return is_match(r"^[+-]?\d+$", value)
                && value
                    .parse::<i128>()
                    .map_or(self == Builtin::Integer, |n| n >= min && n <= max);
        }
        match self {
            Builtin::AnyType
            | Builtin::AnySimpleType
            | Builtin::String
            | Builtin::NormalizedString
            | Builtin::Token
            | Builtin::AnyUri => true,
            Builtin::Boolean => matches!(value, "true" | "false" | "1" | "0"),
            Builtin::Decimal => is_match(r"^[+-]?(\d+(\.\d*)?|\.\d+)$", value),
            Builtin::Double | Builtin::Float => {
                matches!(value, "INF" | "-INF" | "NaN")
                    || is_match(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$", value)
            }
            Builtin::Date => {
                is_match(
                    r"^-?\d{4,}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])(Z|[+-]\d{2}:\d{2})?$",
                    value,
                )
            }
            Builtin::DateTime => is_match(
                r"^-?\d{4,}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])T([01]\d|2[0-4]):[0-5]\d:[0-5]\d(\.\d+)?(Z|[+-]\d{2}:\d{2})?$",
                value,
            ),
            Builtin::Time => is_match(
                r"^([01]\d|2[0-4]):[0-5]\d:[0-5]\d(\.\d+)?(Z|[+-]\d{2}:\d{2})?$",
                value,
            ),
            Builtin::Name => is_match(r"^[A-Za-z_:][\w.:\-]*$", value),
            Builtin::NcName => is_match(r"^[A-Za-z_][\w.\-]*$", value),
            Builtin::Language => is_match(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$", value),
            _ => false,
        }
    }

    /// Whitespace is kept for string types and collapsed for the rest
    fn normalize(self, value: &str) -> &str {
        match self {
            Builtin::String | Builtin::NormalizedString | Builtin::AnySimpleType => value,
            _ => value.trim(),
        }
    }
}

fn is_match(pattern: &str, value: &str) -> bool {
    Regex::new(pattern).map_or(false, |re| re.is_match(value))
}

impl Facets {
    fn check(&self, value: &str) -> Option<String> {
        if !self.enumeration.is_empty() && !self.enumeration.iter().any(|e| e == value) {
            let set = self
                .enumeration
                .iter()
                .map(|e| format!("'{}'", e))
                .collect::<Vec<_>>()
                .join(", ");
            return Some(format!(
                "[facet 'enumeration'] The value '{}' is not an element of the set {{{}}}.",
                value, set
            ));
        }
        for (source, pattern) in &self.patterns {
            if !pattern.is_match(value) {
                return Some(format!(
                    "[facet 'pattern'] The value '{}' is not accepted by the pattern '{}'.",
                    value, source
                ));
            }
        }

        let length = value.chars().count();
        if let Some(expected) = self.length.filter(|l| *l != length) {
            return Some(format!(
                "[facet 'length'] The value '{}' has a length of '{}'; this differs from the allowed length of '{}'.",
                value, length, expected
            ));
        }
        if let Some(min) = self.min_length.filter(|m| length < *m) {
            return Some(format!(
                "[facet 'minLength'] The value '{}' has a length of '{}'; this underruns the allowed minimum length of '{}'.",
                value, length, min
            ));
        }
        if let Some(max) = self.max_length.filter(|m| length > *m) {
            return Some(format!(
                "[facet 'maxLength'] The value '{}' has a length of '{}'; this exceeds the allowed maximum length of '{}'.",
                value, length, max
            ));
        }

        let number = match value.trim().parse::<f64>() {
            Ok(number) => number,
            Err(_) => return None,
        };
        if let Some(min) = self.min_inclusive.filter(|m| number < *m) {
            return Some(format!(
                "[facet 'minInclusive'] The value '{}' is less than the minimum value allowed ('{}').",
                value, min
            ));
        }
        if let Some(max) = self.max_inclusive.filter(|m| number > *m) {
            return Some(format!(
                "[facet 'maxInclusive'] The value '{}' is greater than the maximum value allowed ('{}').",
                value, max
            ));
        }
        if let Some(min) = self.min_exclusive.filter(|m| number <= *m) {
            return Some(format!(
                "[facet 'minExclusive'] The value '{}' must be greater than '{}'.",
                value, min
            ));
        }
        if let Some(max) = self.max_exclusive.filter(|m| number >= *m) {
            return Some(format!(
                "[facet 'maxExclusive'] The value '{}' must be less than '{}'.",
                value, max
            ));
        }
        None
    }
}


// === Schema parsing ===

fn xsd_error(node: roxmltree::Node, message: impl fmt::Display) -> Error {
    let pos = node.document().text_pos_at(node.range().start);
    Error::Xsd(format!("{} (line {})", message, pos.row))
}

fn child_elements<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> {
    node.children()
        .filter(|child| child.is_element() && child.tag_name().name() != "annotation")
}

fn required_attribute<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| {
        xsd_error(
            node,
            format!("xs:{} without a '{}' attribute", node.tag_name().name(), name),
        )
    })
}

/// Namespace settings of one schema document
#[derive(Debug, Clone)]
struct SchemaDoc {
    target: Option<String>,
    qualified_elements: bool,
    qualified_attributes: bool,
    /// Included without a target namespace: unprefixed references take the includer's
    chameleon: bool,
}

impl SchemaDoc {
    /// `including` carries the includer's target namespace for `xs:include`
    fn new(root: roxmltree::Node, including: Option<&Option<String>>) -> Result<Self> {
        let own = root.attribute("targetNamespace").map(str::to_string);
        let (target, chameleon) = match (including, own) {
            (None, own) => (own, false),
            (Some(outer), None) => (outer.clone(), outer.is_some()),
            (Some(outer), Some(own)) if outer.as_deref() == Some(own.as_str()) => (Some(own), false),
            (Some(outer), Some(own)) => {
                return Err(xsd_error(
                    root,
                    format!(
                        "included schema has target namespace '{}' instead of '{}'",
                        own,
                        outer.as_deref().unwrap_or_default()
                    ),
                ))
            }
        };
        Ok(Self {
            target,
            qualified_elements: root.attribute("elementFormDefault") == Some("qualified"),
            qualified_attributes: root.attribute("attributeFormDefault") == Some("qualified"),
            chameleon,
        })
    }

    /// Resolve a QName attribute value against the node's namespace scope
    fn resolve(&self, node: roxmltree::Node, qname: &str) -> (Option<String>, String) {
        let (prefix, local) = match qname.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, qname),
        };
        let namespace = match node.lookup_namespace_uri(prefix) {
            Some(namespace) => Some(namespace.to_string()),
            None if self.chameleon => self.target.clone(),
            None => None,
        };
        (namespace, local.to_string())
    }

    fn key(&self, node: roxmltree::Node, qname: &str) -> String {
        let (namespace, local) = self.resolve(node, qname);
        expanded(namespace.as_deref(), &local)
    }

    /// Key of a global component declared in this document
    fn global(&self, name: &str) -> String {
        expanded(self.target.as_deref(), name)
    }

    /// Resolve a `type`/`base` attribute value
    fn type_ref(&self, node: roxmltree::Node, qname: &str) -> TypeDef {
        let (namespace, local) = self.resolve(node, qname);
        if namespace.as_deref() == Some(XSD_NS) {
            if let Some(builtin) = Builtin::from_name(&local) {
                return TypeDef::Builtin(builtin);
            }
        }
        TypeDef::Named(expanded(namespace.as_deref(), &local))
    }

    /// Namespace of a local element or attribute declaration
    fn local_namespace(&self, node: roxmltree::Node, qualified_by_default: bool) -> Option<String> {
        let qualified = match node.attribute("form") {
            Some(form) => form == "qualified",
            None => qualified_by_default,
        };
        if qualified {
            self.target.clone()
        } else {
            None
        }
    }

    fn occurs(&self, node: roxmltree::Node) -> Result<(u32, Option<u32>)> {
        let min = match node.attribute("minOccurs") {
            Some(raw) => raw
                .parse()
                .map_err(|_| xsd_error(node, format!("invalid minOccurs '{}'", raw)))?,
            None => 1,
        };
        let max = match node.attribute("maxOccurs") {
            Some("unbounded") => None,
            Some(raw) => Some(
                raw.parse()
                    .map_err(|_| xsd_error(node, format!("invalid maxOccurs '{}'", raw)))?,
            ),
            None => Some(1),
        };
        Ok((min, max))
    }

    fn element(&self, node: roxmltree::Node, global: bool) -> Result<ElementDecl> {
        let (min, max) = self.occurs(node)?;

        if let Some(reference) = node.attribute("ref") {
            let (namespace, name) = self.resolve(node, reference);
            return Ok(ElementDecl {
                ty: TypeDef::Ref(expanded(namespace.as_deref(), &name)),
                name,
                namespace,
                min,
                max,
            });
        }

        let name = required_attribute(node, "name")?.to_string();
        let namespace = if global {
            self.target.clone()
        } else {
            self.local_namespace(node, self.qualified_elements)
        };

        let ty = match node.attribute("type") {
            Some(qname) => self.type_ref(node, qname),
            None => match child_elements(node).next() {
                Some(child) if child.tag_name().name() == "complexType" => {
                    TypeDef::Complex(Box::new(self.complex_type(child)?))
                }
                Some(child) if child.tag_name().name() == "simpleType" => {
                    TypeDef::Simple(Box::new(self.simple_type(child)?))
                }
                Some(child) => return Err(unsupported(child)),
                None => TypeDef::Builtin(Builtin::AnyType),
            },
        };

        Ok(ElementDecl {
            name,
            namespace,
            ty,
            min,
            max,
        })
    }

    fn group_ref(&self, node: roxmltree::Node) -> Result<Item> {
        let reference = required_attribute(node, "ref")?;
        let (min, max) = self.occurs(node)?;
        Ok(Item::GroupRef {
            key: self.key(node, reference),
            min,
            max,
        })
    }

    fn particle(&self, node: roxmltree::Node) -> Result<Particle> {
        let compositor = match node.tag_name().name() {
            "sequence" => Compositor::Sequence,
            "choice" => Compositor::Choice,
            "all" => Compositor::All,
            _ => return Err(unsupported(node)),
        };
        let (min, max) = self.occurs(node)?;

        let mut items = Vec::new();
        for child in child_elements(node) {
            let item = match child.tag_name().name() {
                "element" => Item::Element(self.element(child, false)?),
                "sequence" | "choice" if compositor != Compositor::All => {
                    Item::Group(self.particle(child)?)
                }
                "group" if compositor != Compositor::All => self.group_ref(child)?,
                "any" => {
                    let (min, max) = self.occurs(child)?;
                    Item::Any { min, max }
                }
                _ => return Err(unsupported(child)),
            };
            items.push(item);
        }

        Ok(Particle {
            compositor,
            items,
            min,
            max,
        })
    }

    fn attribute(&self, node: roxmltree::Node, global: bool) -> Result<AttributeDecl> {
        let required = node.attribute("use") == Some("required");
        let fixed = node.attribute("fixed").map(str::to_string);

        if let Some(reference) = node.attribute("ref") {
            let (namespace, name) = self.resolve(node, reference);
            return Ok(AttributeDecl {
                ty: TypeDef::Ref(expanded(namespace.as_deref(), &name)),
                name,
                namespace,
                required,
                fixed,
            });
        }

        let name = required_attribute(node, "name")?.to_string();
        let namespace = if global {
            self.target.clone()
        } else {
            self.local_namespace(node, self.qualified_attributes)
        };
        let ty = match node.attribute("type") {
            Some(qname) => self.type_ref(node, qname),
            None => match child_elements(node).find(|c| c.tag_name().name() == "simpleType") {
                Some(child) => TypeDef::Simple(Box::new(self.simple_type(child)?)),
                None => TypeDef::Builtin(Builtin::AnySimpleType),
            },
        };

        Ok(AttributeDecl {
            name,
            namespace,
            ty,
            required,
            fixed,
        })
    }

    fn attribute_group(&self, node: roxmltree::Node) -> Result<AttributeGroup> {
        let mut group = AttributeGroup::default();
        for child in child_elements(node) {
            match child.tag_name().name() {
                "attribute" => group.attributes.push(self.attribute(child, false)?),
                "attributeGroup" => group
                    .groups
                    .push(self.key(child, required_attribute(child, "ref")?)),
                "anyAttribute" => group.any_attribute = true,
                _ => return Err(unsupported(child)),
            }
        }
        Ok(group)
    }

    /// Content model and attribute children shared by complex types and derivations
    fn complex_body_item(&self, child: roxmltree::Node, ty: &mut ComplexType) -> Result<()> {
        match child.tag_name().name() {
            "sequence" | "choice" | "all" => {
                ty.content = Content::Particle(self.particle(child)?);
            }
            "group" => {
                ty.content = Content::Particle(Particle {
                    compositor: Compositor::Sequence,
                    items: vec![self.group_ref(child)?],
                    min: 1,
                    max: Some(1),
                });
            }
            "attribute" => ty.attributes.push(self.attribute(child, false)?),
            "attributeGroup" => ty
                .attribute_groups
                .push(self.key(child, required_attribute(child, "ref")?)),
            "anyAttribute" => ty.any_attribute = true,
            _ => return Err(unsupported(child)),
        }
        Ok(())
    }

    fn complex_type(&self, node: roxmltree::Node) -> Result<ComplexType> {
        let mut ty = ComplexType {
            mixed: node.attribute("mixed") == Some("true"),
            ..ComplexType::default()
        };

        for child in child_elements(node) {
            match child.tag_name().name() {
                "complexContent" => {
                    let derivation = child_elements(child)
                        .next()
                        .ok_or_else(|| xsd_error(child, "complexContent without a derivation"))?;
                    let base = required_attribute(derivation, "base")?;
                    match derivation.tag_name().name() {
                        "extension" => {
                            if let TypeDef::Named(base) = self.type_ref(derivation, base) {
                                ty.base = Some(base);
                            }
                        }
                        "restriction" => {}
                        _ => return Err(unsupported(derivation)),
                    }
                    for item in child_elements(derivation) {
                        self.complex_body_item(item, &mut ty)?;
                    }
                }
                "simpleContent" => {
                    let derivation = child_elements(child)
                        .next()
                        .ok_or_else(|| xsd_error(child, "simpleContent without a derivation"))?;
                    if derivation.tag_name().name() != "extension" {
                        return Err(unsupported(derivation));
                    }
                    let base = required_attribute(derivation, "base")?;
                    ty.content = Content::Simple(self.type_ref(derivation, base));
                    for item in child_elements(derivation) {
                        self.complex_body_item(item, &mut ty)?;
                    }
                }
                _ => self.complex_body_item(child, &mut ty)?,
            }
        }
        Ok(ty)
    }

    fn simple_type(&self, node: roxmltree::Node) -> Result<SimpleType> {
        let derivation = child_elements(node)
            .next()
            .ok_or_else(|| xsd_error(node, "simpleType without a derivation"))?;

        match derivation.tag_name().name() {
            "restriction" => {
                let base = match derivation.attribute("base") {
                    Some(qname) => self.type_ref(derivation, qname),
                    None => match child_elements(derivation).find(|c| c.tag_name().name() == "simpleType") {
                        Some(inline) => TypeDef::Simple(Box::new(self.simple_type(inline)?)),
                        None => return Err(xsd_error(derivation, "restriction without a base")),
                    },
                };

                let mut facets = Facets::default();
                for facet in child_elements(derivation) {
                    let value = facet.attribute("value").unwrap_or_default();
                    match facet.tag_name().name() {
                        "enumeration" => facets.enumeration.push(value.to_string()),
                        "pattern" => {
                            let re = Regex::new(&format!("^(?:{})$", value)).map_err(|e| {
                                xsd_error(facet, format!("invalid pattern '{}': {}", value, e))
                            })?;
                            facets.patterns.push((value.to_string(), re));
                        }
                        "length" => facets.length = Some(parse_number(facet)?),
                        "minLength" => facets.min_length = Some(parse_number(facet)?),
                        "maxLength" => facets.max_length = Some(parse_number(facet)?),
                        "minInclusive" => facets.min_inclusive = Some(parse_number(facet)?),
                        "maxInclusive" => facets.max_inclusive = Some(parse_number(facet)?),
                        "minExclusive" => facets.min_exclusive = Some(parse_number(facet)?),
                        "maxExclusive" => facets.max_exclusive = Some(parse_number(facet)?),
                        "whiteSpace" | "totalDigits" | "fractionDigits" | "simpleType" => {}
                        _ => return Err(unsupported(facet)),
                    }
                }
                Ok(SimpleType::Restriction { base, facets })
            }
            "list" => {
                let item = match derivation.attribute("itemType") {
                    Some(qname) => self.type_ref(derivation, qname),
                    None => match child_elements(derivation).next() {
                        Some(inline) => TypeDef::Simple(Box::new(self.simple_type(inline)?)),
                        None => return Err(xsd_error(derivation, "list without an item type")),
                    },
                };
                Ok(SimpleType::List(item))
            }
            _ => Err(unsupported(derivation)),
        }
    }
}

fn parse_number<T: std::str::FromStr>(node: roxmltree::Node) -> Result<T> {
    let raw = node.attribute("value").unwrap_or_default();
    raw.trim().parse().map_err(|_| {
        xsd_error(
            node,
            format!("invalid value '{}' for facet '{}'", raw, node.tag_name().name()),
        )
    })
}

fn unsupported(node: roxmltree::Node) -> Error {
    xsd_error(
        node,
        format!("unsupported XSD construct 'xs:{}'", node.tag_name().name()),
    )
}

/// Named model and attribute groups, expanded in place once every document is loaded
struct Groups {
    particles: HashMap<String, Particle>,
    attributes: HashMap<String, AttributeGroup>,
}

impl Groups {
    fn element(&self, decl: &mut ElementDecl, depth: usize) -> Result<()> {
        if let TypeDef::Complex(ty) = &mut decl.ty {
            self.complex(ty, depth)?;
        }
        Ok(())
    }

    fn complex(&self, ty: &mut ComplexType, depth: usize) -> Result<()> {
        for key in std::mem::take(&mut ty.attribute_groups) {
            self.attribute_group(&key, &mut ty.attributes, &mut ty.any_attribute, depth)?;
        }
        if let Content::Particle(particle) = &mut ty.content {
            self.particle(particle, depth)?;
        }
        Ok(())
    }

    fn particle(&self, particle: &mut Particle, depth: usize) -> Result<()> {
        if depth > MAX_DERIVATION_DEPTH {
            return Err(Error::Xsd("circular model group reference".to_string()));
        }
        for item in &mut particle.items {
            match item {
                Item::Element(decl) => self.element(decl, depth)?,
                Item::Group(group) => self.particle(group, depth)?,
                Item::GroupRef { key, min, max } => {
                    let mut group = self
                        .particles
                        .get(key.as_str())
                        .cloned()
                        .ok_or_else(|| Error::Xsd(format!("group '{}' is not defined", key)))?;
                    group.min = *min;
                    group.max = *max;
                    self.particle(&mut group, depth + 1)?;
                    *item = Item::Group(group);
                }
                Item::Any { .. } => {}
            }
        }
        Ok(())
    }

    fn attribute_group(
        &self,
        key: &str,
        attributes: &mut Vec<AttributeDecl>,
        any_attribute: &mut bool,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_DERIVATION_DEPTH {
            return Err(Error::Xsd("circular attribute group reference".to_string()));
        }
        let group = self
            .attributes
            .get(key)
            .ok_or_else(|| Error::Xsd(format!("attribute group '{}' is not defined", key)))?;
        attributes.extend(group.attributes.iter().cloned());
        *any_attribute |= group.any_attribute;
        for nested in &group.groups {
            self.attribute_group(nested, attributes, any_attribute, depth + 1)?;
        }
        Ok(())
    }
}

impl XmlSchema {
    /// Parse schema text, resolving includes relative to `base_dir`
    pub fn parse(source: &str, base_dir: &Path) -> Result<Self> {
        let mut schema = XmlSchema::default();
        let mut visited = HashSet::new();
        schema.load(source, base_dir, None, &mut visited)?;
        schema.expand_groups()?;
        schema.check_references()?;
        Ok(schema)
    }

    fn load(
        &mut self,
        source: &str,
        base_dir: &Path,
        including: Option<&Option<String>>,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        let doc = roxmltree::Document::parse(source).map_err(|e| Error::Xsd(e.to_string()))?;
        let root = doc.root_element();
        if root.tag_name().name() != "schema" || root.tag_name().namespace() != Some(XSD_NS) {
            return Err(Error::Xsd(format!(
                "not an XML schema: root element is '{}'",
                root.tag_name().name()
            )));
        }
        let schema_doc = SchemaDoc::new(root, including)?;

        for child in child_elements(root) {
            match child.tag_name().name() {
                "element" => {
                    let decl = schema_doc.element(child, true)?;
                    self.elements.insert(decl.key(), decl);
                }
                "attribute" => {
                    let decl = schema_doc.attribute(child, true)?;
                    self.attributes
                        .insert(expanded(decl.namespace.as_deref(), &decl.name), decl);
                }
                "complexType" => {
                    let name = required_attribute(child, "name")?;
                    self.complex_types
                        .insert(schema_doc.global(name), schema_doc.complex_type(child)?);
                }
                "simpleType" => {
                    let name = required_attribute(child, "name")?;
                    self.simple_types
                        .insert(schema_doc.global(name), schema_doc.simple_type(child)?);
                }
                "group" => {
                    let name = required_attribute(child, "name")?;
                    let model = child_elements(child)
                        .next()
                        .ok_or_else(|| xsd_error(child, "group without a content model"))?;
                    self.groups
                        .insert(schema_doc.global(name), schema_doc.particle(model)?);
                }
                "attributeGroup" => {
                    let name = required_attribute(child, "name")?;
                    self.attribute_groups
                        .insert(schema_doc.global(name), schema_doc.attribute_group(child)?);
                }
                "include" | "import" => {
                    let Some(location) = child.attribute("schemaLocation") else {
                        continue;
                    };
                    let path = base_dir.join(location);
                    if !visited.insert(path.clone()) {
                        continue;
                    }
                    let content = std::fs::read_to_string(&path).map_err(|e| {
                        Error::Xsd(format!(
                            "failed to load included schema {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                    let dir = path
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| base_dir.to_path_buf());
                    let including = (child.tag_name().name() == "include").then_some(&schema_doc.target);
                    self.load(&content, &dir, including, visited)?;
                }
                _ => return Err(unsupported(child)),
            }
        }
        Ok(())
    }

    fn expand_groups(&mut self) -> Result<()> {
        let groups = Groups {
            particles: std::mem::take(&mut self.groups),
            attributes: std::mem::take(&mut self.attribute_groups),
        };
        for decl in self.elements.values_mut() {
            groups.element(decl, 0)?;
        }
        for ty in self.complex_types.values_mut() {
            groups.complex(ty, 0)?;
        }
        Ok(())
    }

    // === Reference checks ===

    fn check_references(&self) -> Result<()> {
        for decl in self.elements.values() {
            self.check_type(&decl.ty)?;
        }
        for attr in self.attributes.values() {
            self.check_attribute(attr)?;
        }
        for ty in self.complex_types.values() {
            self.check_complex(ty)?;
        }
        for ty in self.simple_types.values() {
            self.check_simple(ty)?;
        }
        Ok(())
    }

    fn check_type(&self, ty: &TypeDef) -> Result<()> {
        match ty {
            TypeDef::Builtin(_) => Ok(()),
            TypeDef::Named(name) => {
                if self.complex_types.contains_key(name) || self.simple_types.contains_key(name) {
                    Ok(())
                } else {
                    Err(Error::Xsd(format!("type '{}' is not defined", name)))
                }
            }
            TypeDef::Ref(name) => {
                if self.elements.contains_key(name) {
                    Ok(())
                } else {
                    Err(Error::Xsd(format!("element '{}' is not declared", name)))
                }
            }
            TypeDef::Complex(ty) => self.check_complex(ty),
            TypeDef::Simple(ty) => self.check_simple(ty),
        }
    }

    fn check_attribute(&self, attr: &AttributeDecl) -> Result<()> {
        match &attr.ty {
            TypeDef::Ref(key) if !self.attributes.contains_key(key) => {
                Err(Error::Xsd(format!("attribute '{}' is not declared", key)))
            }
            TypeDef::Ref(_) => Ok(()),
            ty => self.check_type(ty),
        }
    }

    fn check_complex(&self, ty: &ComplexType) -> Result<()> {
        if let Some(base) = &ty.base {
            if !self.complex_types.contains_key(base) {
                return Err(Error::Xsd(format!("type '{}' is not defined", base)));
            }
        }
        for attr in &ty.attributes {
            self.check_attribute(attr)?;
        }
        match &ty.content {
            Content::Empty => Ok(()),
            Content::Simple(base) => self.check_type(base),
            Content::Particle(particle) => self.check_particle(particle),
        }
    }

    fn check_particle(&self, particle: &Particle) -> Result<()> {
        for item in &particle.items {
            match item {
                Item::Element(decl) => self.check_type(&decl.ty)?,
                Item::Group(group) => self.check_particle(group)?,
                Item::GroupRef { key, .. } => {
                    return Err(Error::Xsd(format!("group '{}' is not defined", key)))
                }
                Item::Any { .. } => {}
            }
        }
        Ok(())
    }

    fn check_simple(&self, ty: &SimpleType) -> Result<()> {
        let base = match ty {
            SimpleType::Restriction { base, .. } => base,
            SimpleType::List(item) => item,
        };
        if let TypeDef::Named(name) = base {
            if !self.simple_types.contains_key(name) {
                return Err(Error::Xsd(format!("simple type '{}' is not defined", name)));
            }
        }
        self.check_type(base)
    }

    // === Validation ===

    /// Validate a document, returning every violation found
    pub fn validate(&self, doc: &XmlDocument) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        let root = doc.root();
        match self.elements.get(&root.qualified_name()) {
            Some(decl) => self.validate_element(root, decl, &mut out),
            None => out.push(Diagnostic {
                line: root.line,
                message: format!(
                    "Element '{}': No matching global declaration available for the validation root.",
                    root.qualified_name()
                ),
            }),
        }
        out
    }

    fn validate_element(&self, el: &Element, decl: &ElementDecl, out: &mut Vec<Diagnostic>) {
        let ty = match &decl.ty {
            TypeDef::Ref(name) => match self.elements.get(name) {
                Some(global) => &global.ty,
                None => return,
            },
            ty => ty,
        };

        match ty {
            TypeDef::Builtin(Builtin::AnyType) => {}
            TypeDef::Complex(complex) => self.validate_complex(el, complex, out),
            TypeDef::Named(name) if self.complex_types.contains_key(name) => {
                if let Some(complex) = self.complex_types.get(name) {
                    self.validate_complex(el, complex, out);
                }
            }
            simple => self.validate_simple_element(el, simple, out),
        }
    }

    fn validate_simple_element(&self, el: &Element, ty: &TypeDef, out: &mut Vec<Diagnostic>) {
        let name = el.qualified_name();
        let mut report = |message: String| out.push(Diagnostic { line: el.line, message });

        if !el.children.is_empty() {
            report(format!(
                "Element '{}': Element content is not allowed, because the type definition is simple.",
                name
            ));
            return;
        }
        if let Some(attr) = el
            .attributes
            .iter()
            .find(|attr| attr.namespace.as_deref() != Some(XSI_NS))
        {
            report(format!(
                "Element '{}', attribute '{}': The attribute '{}' is not allowed.",
                name, attr.name, attr.name
            ));
        }
        if let Some(message) = self.check_value(ty, &el.text, 0) {
            report(format!("Element '{}': {}", name, message));
        }
    }

    /// Effective content of a complex type, following extension bases
    fn effective<'a>(
        &'a self,
        ty: &'a ComplexType,
        attributes: &mut Vec<&'a AttributeDecl>,
        particles: &mut Vec<&'a Particle>,
        depth: usize,
    ) -> (Option<&'a TypeDef>, bool) {
        let mut any_attribute = ty.any_attribute;
        let mut simple = None;
        if depth < MAX_DERIVATION_DEPTH {
            if let Some(base) = ty.base.as_ref().and_then(|b| self.complex_types.get(b)) {
                let (base_simple, base_any) = self.effective(base, attributes, particles, depth + 1);
                simple = base_simple;
                any_attribute |= base_any;
            }
        }
        attributes.extend(ty.attributes.iter());
        match &ty.content {
            Content::Empty => {}
            Content::Particle(particle) => particles.push(particle),
            Content::Simple(base) => simple = Some(base),
        }
        (simple, any_attribute)
    }

    fn validate_complex(&self, el: &Element, ty: &ComplexType, out: &mut Vec<Diagnostic>) {
        let name = el.qualified_name();
        let mut attributes = Vec::new();
        let mut particles = Vec::new();
        let (simple, any_attribute) = self.effective(ty, &mut attributes, &mut particles, 0);

        self.validate_attributes(el, &attributes, any_attribute, out);

        if let Some(base) = simple {
            if !el.children.is_empty() {
                out.push(Diagnostic {
                    line: el.line,
                    message: format!(
                        "Element '{}': Element content is not allowed, because the content type is a simple type definition.",
                        name
                    ),
                });
            } else if let Some(message) = self.check_value(base, &el.text, 0) {
                out.push(Diagnostic {
                    line: el.line,
                    message: format!("Element '{}': {}", name, message),
                });
            }
            return;
        }

        let has_text = !el.text.trim().is_empty();
        if particles.is_empty() {
            if !el.children.is_empty() {
                out.push(Diagnostic {
                    line: el.line,
                    message: format!(
                        "Element '{}': Element content is not allowed, because the content type is empty.",
                        name
                    ),
                });
            } else if has_text && !ty.mixed {
                out.push(Diagnostic {
                    line: el.line,
                    message: format!(
                        "Element '{}': Character content is not allowed, because the content type is empty.",
                        name
                    ),
                });
            }
            return;
        }

        if has_text && !ty.mixed {
            out.push(Diagnostic {
                line: el.line,
                message: format!(
                    "Element '{}': Character content other than whitespace is not allowed because the content type is 'element-only'.",
                    name
                ),
            });
        }

        let combined;
        let particle = if particles.len() == 1 {
            particles[0]
        } else {
            combined = Particle {
                compositor: Compositor::Sequence,
                items: particles.iter().map(|p| Item::Group((*p).clone())).collect(),
                min: 1,
                max: Some(1),
            };
            &combined
        };

        self.validate_structure(el, particle, out);

        for child in &el.children {
            if let Some(decl) = find_decl(particle, child) {
                self.validate_element(child, decl, out);
            }
        }
    }

    fn validate_attributes(
        &self,
        el: &Element,
        declared: &[&AttributeDecl],
        any_attribute: bool,
        out: &mut Vec<Diagnostic>,
    ) {
        let name = el.qualified_name();
        for attr in &el.attributes {
            if attr.namespace.as_deref() == Some(XSI_NS) {
                continue;
            }
            let prefix = format!("Element '{}', attribute '{}'", name, attr.name);
            match declared.iter().find(|decl| decl.matches(attr)) {
                Some(decl) => {
                    if let Some(message) = self.check_value(&decl.ty, &attr.value, 0) {
                        out.push(Diagnostic {
                            line: el.line,
                            message: format!("{}: {}", prefix, message),
                        });
                    } else if let Some(fixed) = decl.fixed.as_ref().filter(|f| **f != attr.value) {
                        out.push(Diagnostic {
                            line: el.line,
                            message: format!(
                                "{}: The value '{}' does not match the fixed value constraint '{}'.",
                                prefix, attr.value, fixed
                            ),
                        });
                    }
                }
                None if any_attribute => {}
                None => out.push(Diagnostic {
                    line: el.line,
                    message: format!("{}: The attribute '{}' is not allowed.", prefix, attr.name),
                }),
            }
        }

        for decl in declared.iter().filter(|decl| decl.required) {
            if !el.attributes.iter().any(|attr| decl.matches(attr)) {
                out.push(Diagnostic {
                    line: el.line,
                    message: format!(
                        "Element '{}': The attribute '{}' is required but missing.",
                        name, decl.name
                    ),
                });
            }
        }
    }

    /// Check a simple value, returning the violation message
    fn check_value(&self, ty: &TypeDef, value: &str, depth: usize) -> Option<String> {
        if depth > MAX_DERIVATION_DEPTH {
            return None;
        }
        match ty {
            TypeDef::Builtin(builtin) => {
                let value = builtin.normalize(value);
                (!builtin.accepts(value)).then(|| {
                    format!(
                        "'{}' is not a valid value of the atomic type 'xs:{}'.",
                        value,
                        builtin.name()
                    )
                })
            }
            TypeDef::Named(name) => {
                let simple = self.simple_types.get(name)?;
                self.check_simple_value(simple, value, Some(name.as_str()), depth)
            }
            TypeDef::Simple(simple) => self.check_simple_value(simple, value, None, depth),
            // Only attribute references reach here; element references are resolved first
            TypeDef::Ref(key) => {
                let global = self.attributes.get(key)?;
                self.check_value(&global.ty, value, depth + 1)
            }
            TypeDef::Complex(_) => None,
        }
    }

    fn check_simple_value(
        &self,
        ty: &SimpleType,
        value: &str,
        name: Option<&str>,
        depth: usize,
    ) -> Option<String> {
        match ty {
            SimpleType::List(item) => value
                .split_whitespace()
                .find_map(|token| self.check_value(item, token, depth + 1)),
            SimpleType::Restriction { base, facets } => {
                if let Some(message) = self.check_value(base, value, depth + 1) {
                    return Some(match name {
                        Some(name) => format!(
                            "'{}' is not a valid value of the atomic type '{}'.",
                            value.trim(),
                            name
                        ),
                        None => message,
                    });
                }
                facets.check(value.trim())
            }
        }
    }

    fn validate_structure(&self, el: &Element, particle: &Particle, out: &mut Vec<Diagnostic>) {
        let children = &el.children;
        let whole = Item::Group(particle.clone());
        match match_repeated(&whole, children, 0) {
            Ok(consumed) if consumed == children.len() => {}
            Ok(consumed) => {
                let extra = &children[consumed];
                out.push(Diagnostic {
                    line: extra.line,
                    message: format!(
                        "Element '{}': This element is not expected.",
                        extra.qualified_name()
                    ),
                });
            }
            Err(mismatch) => match children.get(mismatch.at) {
                Some(child) => out.push(Diagnostic {
                    line: child.line,
                    message: format!(
                        "Element '{}': This element is not expected. {}",
                        child.qualified_name(),
                        expected_list(&mismatch.expected)
                    ),
                }),
                None => out.push(Diagnostic {
                    line: el.line,
                    message: format!(
                        "Element '{}': Missing child element(s). {}",
                        el.qualified_name(),
                        expected_list(&mismatch.expected)
                    ),
                }),
            },
        }
    }

    pub fn is_valid(&self, doc: &XmlDocument) -> bool {
        self.validate(doc).is_empty()
    }
}

// === Content model matching ===

/// Where matching failed and what would have been accepted there
struct Mismatch {
    at: usize,
    expected: Vec<String>,
}

fn expected_list(expected: &[String]) -> String {
    match expected {
        [single] => format!("Expected is ( {} ).", single),
        many => format!("Expected is one of ( {} ).", many.join(", ")),
    }
}

/// Match one occurrence of `item` at `start`, returning the children consumed
fn match_once(item: &Item, children: &[Element], start: usize) -> std::result::Result<usize, Mismatch> {
    match item {
        Item::Element(decl) => match children.get(start) {
            Some(child) if decl.matches(child) => Ok(1),
            _ => Err(Mismatch {
                at: start,
                expected: vec![decl.key()],
            }),
        },
        Item::Any { .. } => {
            if start < children.len() {
                Ok(1)
            } else {
                Err(Mismatch {
                    at: start,
                    expected: vec!["##any".to_string()],
                })
            }
        }
        Item::Group(particle) => match_particle(particle, children, start),
        Item::GroupRef { .. } => Ok(0),
    }
}

/// Match `item` as many times as its occurrence bounds allow
fn match_repeated(item: &Item, children: &[Element], start: usize) -> std::result::Result<usize, Mismatch> {
    let (min, max) = item.occurs();
    let mut pos = start;
    let mut count = 0;
    while max.map_or(true, |max| count < max) {
        match match_once(item, children, pos) {
            Ok(0) => break,
            Ok(consumed) => {
                pos += consumed;
                count += 1;
            }
            Err(mismatch) if count < min => return Err(mismatch),
            Err(_) => break,
        }
    }
    Ok(pos - start)
}

fn match_particle(particle: &Particle, children: &[Element], start: usize) -> std::result::Result<usize, Mismatch> {
    match particle.compositor {
        Compositor::Sequence => {
            let mut pos = start;
            for item in &particle.items {
                pos += match_repeated(item, children, pos)?;
            }
            Ok(pos - start)
        }
        Compositor::Choice => {
            let mut expected = Vec::new();
            let mut optional = false;
            for item in &particle.items {
                match match_once(item, children, start) {
                    Ok(0) => optional = true,
                    Ok(_) => return match_repeated(item, children, start),
                    Err(_) => {
                        optional |= item.occurs().0 == 0;
                        item.describe(&mut expected);
                    }
                }
            }
            if optional {
                Ok(0)
            } else {
                Err(Mismatch { at: start, expected })
            }
        }
        Compositor::All => {
            let mut pos = start;
            let mut seen = vec![false; particle.items.len()];
            loop {
                let next = particle.items.iter().enumerate().find_map(|(index, item)| {
                    if seen[index] {
                        return None;
                    }
                    match match_once(item, children, pos) {
                        Ok(consumed) if consumed > 0 => Some((index, consumed)),
                        _ => None,
                    }
                });
                match next {
                    Some((index, consumed)) => {
                        seen[index] = true;
                        pos += consumed;
                    }
                    None => break,
                }
            }

            let mut expected = Vec::new();
            for (index, item) in particle.items.iter().enumerate() {
                if !seen[index] && item.occurs().0 > 0 {
                    item.describe(&mut expected);
                }
            }
            if expected.is_empty() {
                Ok(pos - start)
            } else {
                Err(Mismatch { at: pos, expected })
            }
        }
    }
}

/// Find the declaration a child element was matched against
fn find_decl<'a>(particle: &'a Particle, child: &Element) -> Option<&'a ElementDecl> {
    particle.items.iter().find_map(|item| match item {
        Item::Element(decl) if decl.matches(child) => Some(decl),
        Item::Group(group) => find_decl(group, child),
        _ => None,
    })
}
