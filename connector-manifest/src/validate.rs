//! Load-time structural checks for manifests.

use std::collections::HashSet;

use crate::error::{ManifestError, ManifestResult};
use crate::model::{Manifest, Operation, ParamSpec};
use crate::path;

pub(crate) fn validate_manifest(manifest: &Manifest) -> ManifestResult<()> {
    let provider = manifest.provider().as_str();
    let invalid = |reason: String| ManifestError::Invalid {
        provider: provider.to_owned(),
        reason,
    };

    if manifest.display_name().trim().is_empty() {
        return Err(invalid("displayName cannot be empty".into()));
    }

    let base = manifest.base_url();
    if !(base.starts_with("https://") || base.starts_with("http://")) {
        return Err(invalid(format!(
            "baseUrl must start with http:// or https://, got `{base}`"
        )));
    }

    if let Some(limit) = manifest.rate_limit() {
        if limit.requests == 0 || limit.window_seconds == 0 {
            return Err(invalid(
                "rateLimit requests and windowSeconds must be non-zero".into(),
            ));
        }
    }

    if let Some(prefix) = manifest.blocklist().iter().find(|p| !p.starts_with('/')) {
        return Err(invalid(format!(
            "blocklist entry `{prefix}` must start with `/`"
        )));
    }

    if manifest.operations().is_empty() {
        return Err(invalid("manifest declares no operations".into()));
    }

    let mut seen = HashSet::new();
    for operation in manifest.operations() {
        if !seen.insert(operation.id()) {
            return Err(invalid(format!(
                "duplicate operation id `{}`",
                operation.id()
            )));
        }
        validate_operation(provider, operation)?;
    }

    Ok(())
}

fn validate_operation(provider: &str, operation: &Operation) -> ManifestResult<()> {
    let invalid = |reason: String| ManifestError::InvalidOperation {
        provider: provider.to_owned(),
        operation: operation.id().to_owned(),
        reason,
    };

    let id = operation.id();
    if !id.starts_with(|c: char| c.is_ascii_lowercase())
        || !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(invalid(
            "operation id must be lowercase snake_case starting with a letter".into(),
        ));
    }

    if !operation.path().starts_with('/') {
        return Err(invalid("path must start with `/`".into()));
    }

    let placeholders = path::placeholders(operation.path()).map_err(invalid)?;

    let mut names = HashSet::new();
    for spec in operation.inputs() {
        if spec.name().trim().is_empty() {
            return Err(invalid("parameter names cannot be empty".into()));
        }
        if !names.insert(spec.name()) {
            return Err(invalid(format!(
                "parameter `{}` declared more than once",
                spec.name()
            )));
        }
        validate_param(spec).map_err(invalid)?;
    }

    for placeholder in &placeholders {
        let Some(spec) = operation.params().iter().find(|p| p.name() == *placeholder) else {
            return Err(invalid(format!(
                "path placeholder `{{{placeholder}}}` is not a declared param"
            )));
        };
        if !spec.required() {
            return Err(invalid(format!(
                "path param `{placeholder}` must be required"
            )));
        }
        if spec.kind().is_structured() {
            return Err(invalid(format!(
                "path param `{placeholder}` cannot be an array or object"
            )));
        }
    }

    if !operation.method().carries_body() {
        if !operation.body().is_empty() {
            return Err(invalid(format!(
                "{} operations cannot declare body fields",
                operation.method().as_str()
            )));
        }
        if let Some(spec) = operation.params().iter().find(|p| {
            p.kind().is_structured() && p.style().is_none() && !placeholders.contains(&p.name())
        }) {
            return Err(invalid(format!(
                "query param `{}` is structured and must declare a style",
                spec.name()
            )));
        }
    }

    Ok(())
}

fn validate_param(spec: &ParamSpec) -> Result<(), String> {
    if let Some(value) = spec.allowed().iter().find(|v| !spec.kind().matches(v)) {
        return Err(format!(
            "enum value {value} of `{}` is not a {}",
            spec.name(),
            spec.kind().as_str()
        ));
    }
    if let Some(default) = spec.default_value() {
        if !spec.kind().matches(default) {
            return Err(format!(
                "default of `{}` is not a {}",
                spec.name(),
                spec.kind().as_str()
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{Manifest, ManifestError};

    fn manifest_with(operation: serde_json::Value) -> serde_json::Value {
        json!({
            "provider": "ats",
            "displayName": "ATS",
            "baseUrl": "https://api.example.com",
            "operations": [operation]
        })
    }

    fn op_error(operation: serde_json::Value) -> String {
        match Manifest::from_value(manifest_with(operation)) {
            Err(ManifestError::InvalidOperation { reason, .. }) => reason,
            other => panic!("expected invalid operation, got {other:?}"),
        }
    }

    #[test]
    fn undeclared_placeholder_is_rejected() {
        let reason = op_error(json!({
            "id": "get_candidate", "method": "GET", "path": "/candidates/{id}", "access": "read"
        }));
        assert!(reason.contains("not a declared param"));
    }

    #[test]
    fn optional_path_param_is_rejected() {
        let reason = op_error(json!({
            "id": "get_candidate", "method": "GET", "path": "/candidates/{id}", "access": "read",
            "params": [{"name": "id"}]
        }));
        assert!(reason.contains("must be required"));
    }

    #[test]
    fn structured_query_param_needs_style() {
        let reason = op_error(json!({
            "id": "search", "method": "GET", "path": "/candidates", "access": "read",
            "params": [{"name": "tags", "type": "array", "items": "string"}]
        }));
        assert!(reason.contains("must declare a style"));
    }

    #[test]
    fn enum_values_must_match_type() {
        let reason = op_error(json!({
            "id": "search", "method": "GET", "path": "/candidates", "access": "read",
            "params": [{"name": "stage", "type": "integer", "enum": ["new"]}]
        }));
        assert!(reason.contains("is not a integer"));
    }

    #[test]
    fn missing_access_fails_to_parse() {
        let err = Manifest::from_value(manifest_with(json!({
            "id": "search", "method": "GET", "path": "/candidates"
        })))
        .unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
    }

    #[test]
    fn duplicate_operation_ids_are_rejected() {
        let op = json!({"id": "search", "method": "GET", "path": "/c", "access": "read"});
        let raw = json!({
            "provider": "ats",
            "displayName": "ATS",
            "baseUrl": "https://api.example.com",
            "operations": [op.clone(), op]
        });
        let err = Manifest::from_value(raw).unwrap_err();
        assert!(matches!(err, ManifestError::Invalid { reason, .. } if reason.contains("duplicate")));
    }

    #[test]
    fn get_with_body_is_rejected() {
        let reason = op_error(json!({
            "id": "search", "method": "GET", "path": "/c", "access": "read",
            "body": [{"name": "q"}]
        }));
        assert!(reason.contains("cannot declare body fields"));
    }
}
