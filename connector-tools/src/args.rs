//! Helpers for reading tool arguments out of a JSON input.

use serde_json::{Map, Value};

use crate::error::{ToolError, ToolResult};

/// Turns a tool input into an argument map. `null` reads as no arguments.
///
/// # Errors
///
/// Returns [`ToolError::InvalidInput`] when the input is not an object.
pub fn into_object(input: Value) -> ToolResult<Map<String, Value>> {
    match input {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ToolError::invalid_input(format!(
            "expected an object of arguments, got {}",
            type_name(&other)
        ))),
    }
}

/// Reads a required, non-blank string argument.
///
/// # Errors
///
/// Returns [`ToolError::InvalidInput`] when it is absent, blank, or not a string.
pub fn required_str<'a>(args: &'a Map<String, Value>, name: &str) -> ToolResult<&'a str> {
    match optional_str(args, name)? {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ToolError::invalid_input(format!("`{name}` is required"))),
    }
}

/// Reads an optional string argument.
///
/// # Errors
///
/// Returns [`ToolError::InvalidInput`] when present but not a string.
pub fn optional_str<'a>(args: &'a Map<String, Value>, name: &str) -> ToolResult<Option<&'a str>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(other) => Err(ToolError::invalid_input(format!(
            "`{name}` must be a string, got {}",
            type_name(other)
        ))),
    }
}

/// Reads an optional non-negative integer argument.
///
/// # Errors
///
/// Returns [`ToolError::InvalidInput`] when present but not a non-negative integer.
pub fn optional_u64(args: &Map<String, Value>, name: &str) -> ToolResult<Option<u64>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            ToolError::invalid_input(format!("`{name}` must be a non-negative integer"))
        }),
    }
}

/// Reads a required positive integer argument.
///
/// # Errors
///
/// Returns [`ToolError::InvalidInput`] when absent, zero, or not an integer.
pub fn required_positive(args: &Map<String, Value>, name: &str) -> ToolResult<u64> {
    match optional_u64(args, name)? {
        Some(value) if value > 0 => Ok(value),
        Some(_) => Err(ToolError::invalid_input(format!("`{name}` must be at least 1"))),
        None => Err(ToolError::invalid_input(format!("`{name}` is required"))),
    }
}

/// Reads an optional list of strings.
///
/// # Errors
///
/// Returns [`ToolError::InvalidInput`] when present but not an array of strings.
pub fn optional_string_list(args: &Map<String, Value>, name: &str) -> ToolResult<Option<Vec<String>>> {
    let Some(value) = args.get(name).filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let invalid = || ToolError::invalid_input(format!("`{name}` must be a list of strings"));
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|item| item.as_str().map(str::to_owned).ok_or_else(invalid))
        .collect::<ToolResult<Vec<_>>>()
        .map(Some)
}

/// Renders a scalar argument as cell text. Strings are taken verbatim.
#[must_use]
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        into_object(value).unwrap()
    }

    #[test]
    fn null_input_is_empty_arguments() {
        assert!(into_object(Value::Null).unwrap().is_empty());
        assert!(into_object(json!([1])).is_err());
    }

    #[test]
    fn reads_strings() {
        let a = args(json!({"url": "https://example.com", "blank": "  ", "n": 3}));
        assert_eq!(required_str(&a, "url").unwrap(), "https://example.com");
        assert!(required_str(&a, "blank").is_err());
        assert!(required_str(&a, "missing").is_err());
        assert!(optional_str(&a, "n").is_err());
        assert_eq!(optional_str(&a, "missing").unwrap(), None);
    }

    #[test]
    fn reads_integers() {
        let a = args(json!({"limit": 5, "zero": 0, "neg": -1, "text": "5"}));
        assert_eq!(optional_u64(&a, "limit").unwrap(), Some(5));
        assert!(optional_u64(&a, "neg").is_err());
        assert!(optional_u64(&a, "text").is_err());
        assert!(required_positive(&a, "zero").is_err());
        assert_eq!(required_positive(&a, "limit").unwrap(), 5);
    }

    #[test]
    fn reads_string_lists() {
        let a = args(json!({"columns": ["Name", "Email"], "bad": ["Name", 1]}));
        assert_eq!(
            optional_string_list(&a, "columns").unwrap(),
            Some(vec!["Name".to_owned(), "Email".to_owned()])
        );
        assert!(optional_string_list(&a, "bad").is_err());
        assert_eq!(optional_string_list(&a, "missing").unwrap(), None);
    }

    #[test]
    fn scalar_text_keeps_strings_verbatim() {
        assert_eq!(scalar_text(&json!("Ada")), "Ada");
        assert_eq!(scalar_text(&json!(42)), "42");
        assert_eq!(scalar_text(&json!(true)), "true");
    }
}
