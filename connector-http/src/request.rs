//! Argument validation and parameter placement.

use std::collections::HashSet;

use connector_manifest::path::{self, Unresolved};
use connector_manifest::{HttpMethod, Operation, ParamSpec, ParamStyle, ParamType};
use serde_json::{Map, Value};

use crate::error::{ExecutionError, ExecutionResult};

/// An operation call with every argument validated and placed.
#[derive(Debug)]
pub(crate) struct PreparedCall {
    pub(crate) method: HttpMethod,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<Map<String, Value>>,
}

impl PreparedCall {
    /// Path plus encoded query string, with `extra` pairs appended.
    pub(crate) fn path_and_query(&self, extra: &[(String, String)]) -> String {
        let mut out = self.path.clone();
        let mut pairs = self.query.iter().chain(extra.iter()).peekable();
        if pairs.peek().is_some() {
            out.push('?');
            let encoded: Vec<String> = pairs
                .map(|(k, v)| format!("{}={}", encode_key(k), urlencoding::encode(v)))
                .collect();
            out.push_str(&encoded.join("&"));
        }
        out
    }
}

/// Validates `args` against the operation and decides where each value goes.
pub(crate) fn prepare(operation: &Operation, args: &Map<String, Value>) -> ExecutionResult<PreparedCall> {
    let declared: HashSet<&str> = operation.inputs().map(ParamSpec::name).collect();
    if let Some(unknown) = args.keys().find(|k| !declared.contains(k.as_str())) {
        let mut accepted: Vec<&str> = declared.into_iter().collect();
        accepted.sort_unstable();
        return Err(ExecutionError::invalid_argument(
            unknown.as_str(),
            format!("not accepted by `{}`; expected one of: {}", operation.id(), accepted.join(", ")),
        ));
    }

    let mut values: Vec<(&ParamSpec, Value)> = Vec::new();
    for spec in operation.inputs() {
        let supplied = args.get(spec.name()).filter(|v| !v.is_null());
        let value = match (supplied, spec.default_value()) {
            (Some(value), _) => value.clone(),
            (None, _) if spec.required() => {
                return Err(ExecutionError::MissingArgument {
                    name: spec.name().to_owned(),
                });
            }
            (None, Some(default)) => default.clone(),
            (None, None) => continue,
        };
        check_value(spec, &value)?;
        values.push((spec, value));
    }

    let placeholders = operation.path_placeholders();
    let path = path::resolve(operation.path(), |name| {
        values
            .iter()
            .find(|(spec, _)| spec.name() == name)
            .map(|(_, value)| urlencoding::encode(&scalar_text(value)).into_owned())
    })
    .map_err(|err| match err {
        Unresolved::Missing(name) => ExecutionError::UnresolvedPlaceholder { name },
        Unresolved::Malformed(reason) => ExecutionError::configuration(reason),
    })?;

    let method = operation.method();
    let mut query = Vec::new();
    let mut body = Map::new();

    for (spec, value) in values {
        if placeholders.contains(&spec.name()) {
            continue;
        }
        if method.carries_body() {
            body.insert(spec.name().to_owned(), value);
        } else {
            push_query(&mut query, spec, &value)?;
        }
    }

    Ok(PreparedCall {
        method,
        path,
        query,
        body: method.carries_body().then_some(body),
    })
}

fn check_value(spec: &ParamSpec, value: &Value) -> ExecutionResult<()> {
    if !spec.kind().matches(value) {
        return Err(ExecutionError::invalid_argument(
            spec.name(),
            format!("expected {}", spec.kind().as_str()),
        ));
    }
    if !spec.allowed().is_empty() && !spec.allowed().contains(value) {
        let allowed: Vec<String> = spec.allowed().iter().map(Value::to_string).collect();
        return Err(ExecutionError::invalid_argument(
            spec.name(),
            format!("must be one of {}", allowed.join(", ")),
        ));
    }
    if let (Some(items), Value::Array(elements)) = (spec.items(), value) {
        if elements.iter().any(|element| !items.matches(element)) {
            return Err(ExecutionError::invalid_argument(
                spec.name(),
                format!("every element must be {}", items.as_str()),
            ));
        }
    }
    Ok(())
}

fn push_query(query: &mut Vec<(String, String)>, spec: &ParamSpec, value: &Value) -> ExecutionResult<()> {
    let name = spec.name();
    match (spec.kind(), value) {
        (ParamType::Array | ParamType::Object, _) => {
            let style = spec.style().ok_or_else(|| {
                ExecutionError::configuration(format!("query param `{name}` declares no style"))
            })?;
            push_structured(query, name, style, value);
        }
        (_, scalar) => query.push((name.to_owned(), scalar_text(scalar))),
    }
    Ok(())
}

fn push_structured(query: &mut Vec<(String, String)>, name: &str, style: ParamStyle, value: &Value) {
    match (style, value) {
        (ParamStyle::Json, _) => query.push((name.to_owned(), value.to_string())),
        (ParamStyle::Csv, Value::Array(items)) => {
            let joined: Vec<String> = items.iter().map(scalar_text).collect();
            query.push((name.to_owned(), joined.join(",")));
        }
        (ParamStyle::Csv, Value::Object(fields)) => {
            let joined: Vec<String> = fields
                .iter()
                .flat_map(|(k, v)| [k.clone(), scalar_text(v)])
                .collect();
            query.push((name.to_owned(), joined.join(",")));
        }
        (ParamStyle::Repeat, Value::Array(items)) => {
            query.extend(items.iter().map(|item| (name.to_owned(), scalar_text(item))));
        }
        (ParamStyle::Repeat, Value::Object(fields)) => {
            query.extend(fields.iter().map(|(k, v)| (k.clone(), scalar_text(v))));
        }
        (ParamStyle::Brackets, Value::Array(items)) => {
            query.extend(items.iter().map(|item| (format!("{name}[]"), scalar_text(item))));
        }
        (ParamStyle::Brackets, Value::Object(fields)) => {
            query.extend(
                fields
                    .iter()
                    .map(|(k, v)| (format!("{name}[{k}]"), scalar_text(v))),
            );
        }
        (_, scalar) => query.push((name.to_owned(), scalar_text(scalar))),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn encode_key(key: &str) -> String {
    // Keep `[` and `]` readable in bracket-style keys.
    urlencoding::encode(key)
        .replace("%5B", "[")
        .replace("%5D", "]")
}

#[cfg(test)]
mod tests {
    use connector_manifest::Manifest;
    use serde_json::json;

    use super::*;

    fn operation(op: Value) -> Operation {
        let manifest = Manifest::from_value(json!({
            "provider": "demo",
            "displayName": "Demo",
            "baseUrl": "https://api.example.com",
            "operations": [op]
        }))
        .unwrap();
        manifest.operations()[0].clone()
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn get_leftovers_become_query_with_defaults() {
        let op = operation(json!({
            "id": "list_issues", "method": "GET", "path": "/repos/{owner}/issues", "access": "read",
            "params": [
                {"name": "owner", "required": true},
                {"name": "state", "enum": ["open", "closed"], "default": "open"},
                {"name": "labels", "type": "array", "items": "string", "style": "csv"}
            ]
        }));
        let call = prepare(&op, &args(json!({"owner": "octo cat", "labels": ["bug", "p1"]}))).unwrap();

        assert_eq!(call.path, "/repos/octo%20cat/issues");
        assert_eq!(
            call.query,
            [("state".to_owned(), "open".to_owned()), ("labels".to_owned(), "bug,p1".to_owned())]
        );
        assert!(call.body.is_none());
        assert_eq!(call.path_and_query(&[]), "/repos/octo%20cat/issues?state=open&labels=bug%2Cp1");
    }

    #[test]
    fn post_leftovers_merge_into_body() {
        let op = operation(json!({
            "id": "create", "method": "POST", "path": "/orgs/{org}/things", "access": "write",
            "params": [{"name": "org", "required": true}, {"name": "dry_run", "type": "boolean"}],
            "body": [{"name": "title", "required": true}, {"name": "tags", "type": "array"}]
        }));
        let call = prepare(
            &op,
            &args(json!({"org": "acme", "dry_run": true, "title": "Hi", "tags": ["a"]})),
        )
        .unwrap();

        assert_eq!(call.path, "/orgs/acme/things");
        assert!(call.query.is_empty());
        assert_eq!(
            Value::Object(call.body.unwrap()),
            json!({"dry_run": true, "title": "Hi", "tags": ["a"]})
        );
    }

    #[test]
    fn styles_follow_the_declaration() {
        let op = operation(json!({
            "id": "search", "method": "GET", "path": "/s", "access": "read",
            "params": [
                {"name": "tag", "type": "array", "style": "repeat"},
                {"name": "ids", "type": "array", "style": "brackets"},
                {"name": "filter", "type": "object", "style": "json"}
            ]
        }));
        let call = prepare(
            &op,
            &args(json!({"tag": ["a", "b"], "ids": [1, 2], "filter": {"x": 1}})),
        )
        .unwrap();
        assert_eq!(
            call.path_and_query(&[]),
            "/s?tag=a&tag=b&ids[]=1&ids[]=2&filter=%7B%22x%22%3A1%7D"
        );
    }

    #[test]
    fn missing_required_argument_is_named() {
        let op = operation(json!({
            "id": "get", "method": "GET", "path": "/c/{id}", "access": "read",
            "params": [{"name": "id", "required": true}]
        }));
        let err = prepare(&op, &Map::new()).unwrap_err();
        assert!(matches!(err, ExecutionError::MissingArgument { name } if name == "id"));
    }

    #[test]
    fn null_counts_as_missing() {
        let op = operation(json!({
            "id": "get", "method": "GET", "path": "/c/{id}", "access": "read",
            "params": [{"name": "id", "required": true}]
        }));
        let err = prepare(&op, &args(json!({"id": null}))).unwrap_err();
        assert!(matches!(err, ExecutionError::MissingArgument { .. }));
    }

    #[test]
    fn type_enum_and_unknown_arguments_are_rejected() {
        let op = operation(json!({
            "id": "list", "method": "GET", "path": "/c", "access": "read",
            "params": [
                {"name": "limit", "type": "integer"},
                {"name": "state", "enum": ["open"]}
            ]
        }));
        assert!(matches!(
            prepare(&op, &args(json!({"limit": "ten"}))).unwrap_err(),
            ExecutionError::InvalidArgument { name, .. } if name == "limit"
        ));
        assert!(matches!(
            prepare(&op, &args(json!({"state": "closed"}))).unwrap_err(),
            ExecutionError::InvalidArgument { name, .. } if name == "state"
        ));
        assert!(matches!(
            prepare(&op, &args(json!({"bogus": 1}))).unwrap_err(),
            ExecutionError::InvalidArgument { name, .. } if name == "bogus"
        ));
    }
}
