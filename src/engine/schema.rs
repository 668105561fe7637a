//! Declarative fixture validation
//!
//! A [`FixtureSchema`] lists the fields a scenario expects, with their types
//! and constraints. Validation stops at the first violation and reports it as
//! [`Error::FixtureInvalid`].

use regex::Regex;
use serde_json::Value;

use crate::common::error::Constraint;
use crate::common::{Error, Result};

/// Expected JSON type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

impl FieldType {
    fn name(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Any => "value",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
            FieldType::Any => true,
        }
    }
}

/// One field rule
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    ty: FieldType,
    required: bool,
    non_empty: bool,
    pattern: Option<String>,
    allowed: Vec<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            non_empty: false,
            pattern: None,
            allowed: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Reject empty strings
    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }

    /// String values must match this regular expression
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// String values must be one of these
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = values.iter().map(|v| v.to_string()).collect();
        self
    }

    fn check(&self, test: &str, value: Option<&Value>) -> Result<()> {
        let invalid = |constraint| Err(Error::fixture_invalid(test, &self.name, constraint));

        let value = match value {
            Some(value) => value,
            None if self.required => return invalid(Constraint::Required),
            None => return Ok(()),
        };
        if !self.ty.accepts(value) {
            return invalid(Constraint::WrongType(self.ty.name()));
        }

        if let Some(text) = value.as_str() {
            if self.non_empty && text.is_empty() {
                return invalid(Constraint::Empty);
            }
            if let Some(pattern) = &self.pattern {
                let re = Regex::new(pattern).map_err(|e| {
                    Error::Internal(format!("Invalid pattern for '{}': {}", self.name, e))
                })?;
                if !re.is_match(text) {
                    return invalid(Constraint::Pattern(pattern.clone()));
                }
            }
            if !self.allowed.is_empty() && !self.allowed.iter().any(|a| a == text) {
                return invalid(Constraint::NotAllowed(self.allowed.clone()));
            }
        }
        Ok(())
    }
}

/// Validation rules for a scenario's fixtures
#[derive(Debug, Clone, Default)]
pub struct FixtureSchema {
    fields: Vec<Field>,
    exclusive: Vec<(String, String)>,
    allow_unknown: bool,
}

impl FixtureSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// A schema accepting any object
    pub fn any() -> Self {
        Self::new().allow_unknown()
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// At most one of `a` and `b` may be present
    pub fn exclusive(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.exclusive.push((a.into(), b.into()));
        self
    }

    /// Keep fields the schema does not declare
    pub fn allow_unknown(mut self) -> Self {
        self.allow_unknown = true;
        self
    }

    /// Check `fixtures` for the test named `test`
    pub fn validate(&self, test: &str, fixtures: &Value) -> Result<()> {
        let object = fixtures.as_object().ok_or_else(|| {
            Error::fixture_invalid(test, "value", Constraint::WrongType("object"))
        })?;

        for field in &self.fields {
            field.check(test, object.get(&field.name))?;
        }

        if !self.allow_unknown {
            if let Some(key) = object
                .keys()
                .find(|key| !self.fields.iter().any(|f| &f.name == *key))
            {
                return Err(Error::fixture_invalid(test, key, Constraint::Unknown));
            }
        }

        for (a, b) in &self.exclusive {
            if object.contains_key(a) && object.contains_key(b) {
                return Err(Error::fixture_invalid(
                    test,
                    a,
                    Constraint::Exclusive(b.clone()),
                ));
            }
        }
        Ok(())
    }
}
