//! Template rendering for scenario scripts and request bodies
//!
//! Two modes share one strict environment (undefined variables are errors):
//!
//! - [`Mode::Code`] renders scenario scripts. Every interpolated value is
//!   written as a literal: strings are quoted and escaped, objects and arrays
//!   become JSON. The `unquote` filter inserts a string verbatim.
//! - [`Mode::Text`] renders plain text, such as request bodies.

use minijinja::value::{Value as TemplateValue, ValueKind};
use minijinja::{Environment, ErrorKind, Output, State, UndefinedBehavior};
use serde::Serialize;

use crate::common::Result;

/// How interpolated values are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Code,
    Text,
}

fn environment(mode: Mode) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    if mode == Mode::Code {
        env.set_formatter(literal_formatter);
        env.add_filter("unquote", unquote);
    }
    env
}

/// Render `source` with `data` as its variables
pub fn render<S: Serialize>(source: &str, data: &S, mode: Mode) -> Result<String> {
    Ok(environment(mode).render_str(source, data)?)
}

fn unquote(value: TemplateValue) -> TemplateValue {
    match value.as_str() {
        Some(text) => TemplateValue::from_safe_string(text.to_string()),
        None => TemplateValue::from_safe_string(value.to_string()),
    }
}

fn literal_formatter(
    out: &mut Output,
    state: &State,
    value: &TemplateValue,
) -> std::result::Result<(), minijinja::Error> {
    if value.is_undefined() {
        return Err(minijinja::Error::from(ErrorKind::UndefinedError));
    }
    if value.is_safe() {
        return minijinja::escape_formatter(out, state, value);
    }

    let literal = match value.kind() {
        ValueKind::String => serde_json::to_string(value.as_str().unwrap_or_default()),
        _ => serde_json::to_string(value),
    }
    .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()))?;

    out.write_str(&literal)
        .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind as Kind;
    use serde_json::json;

    #[test]
    fn test_code_mode_quotes_strings() {
        let out = render(
            "url: {{ host ~ url }}\ncode: {{ code }}",
            &json!({"host": "http://localhost", "url": "/a\"b", "code": 200}),
            Mode::Code,
        )
        .unwrap();
        assert_eq!(out, "url: \"http://localhost/a\\\"b\"\ncode: 200");
    }

    #[test]
    fn test_code_mode_serializes_structures() {
        let out = render(
            "data: {{ user }}",
            &json!({"user": {"name": "ada", "tags": [1, 2]}}),
            Mode::Code,
        )
        .unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(out.trim_start_matches("data: ")).unwrap();
        assert_eq!(parsed, json!({"name": "ada", "tags": [1, 2]}));
    }

    #[test]
    fn test_unquote_inserts_raw_text() {
        let out = render("{{ op | unquote }} 1", &json!({"op": "return:"}), Mode::Code).unwrap();
        assert_eq!(out, "return: 1");
    }

    #[test]
    fn test_text_mode_is_plain() {
        let out = render("Hello {{ name }}!", &json!({"name": "ada"}), Mode::Text).unwrap();
        assert_eq!(out, "Hello ada!");
    }

    #[test]
    fn test_undefined_variable_is_an_error() {
        for mode in [Mode::Code, Mode::Text] {
            let err = render("{{ missing }}", &json!({}), mode).unwrap_err();
            assert_eq!(err.kind(), Kind::Parse);
            assert!(err.to_string().contains("undefined"));
        }
    }

    #[test]
    fn test_conditionals_on_defined() {
        let source = "{% if body is defined %}body{% else %}none{% endif %}";
        assert_eq!(render(source, &json!({}), Mode::Code).unwrap(), "none");
        assert_eq!(render(source, &json!({"body": "x"}), Mode::Code).unwrap(), "body");
    }
}
