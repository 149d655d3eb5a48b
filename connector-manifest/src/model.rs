//! Manifest data model.

use std::collections::BTreeMap;
use std::time::Duration;

use connector_primitives::{Access, ProviderId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ManifestResult;
use crate::path;
use crate::validate::validate_manifest;

/// Static declaration of one external API.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    provider: ProviderId,
    display_name: String,
    #[serde(default)]
    category: String,
    base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version_header: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    default_headers: BTreeMap<String, String>,
    #[serde(default)]
    auth: AuthMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rate_limit: Option<RateLimit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    blocklist: Vec<String>,
    operations: Vec<Operation>,
}

impl Manifest {
    /// Parses and validates a manifest from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ManifestError::Parse`] for malformed JSON and
    /// [`crate::ManifestError::Invalid`] or
    /// [`crate::ManifestError::InvalidOperation`] when a structural invariant
    /// does not hold.
    pub fn from_json_str(raw: &str) -> ManifestResult<Self> {
        let manifest: Self = serde_json::from_str(raw)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parses and validates a manifest from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// See [`Manifest::from_json_str`].
    pub fn from_value(value: Value) -> ManifestResult<Self> {
        let manifest: Self = serde_json::from_value(value)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Re-runs the load-time structural checks.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> ManifestResult<()> {
        validate_manifest(self)
    }

    /// Provider identifier; also the tool-name prefix.
    #[must_use]
    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    /// Human-friendly provider name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Free-form category label (e.g. `ats`, `scheduling`).
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Base URL every operation path is appended to, without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Optional API version string.
    #[must_use]
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// Header carrying [`Manifest::api_version`], when the provider wants one.
    #[must_use]
    pub fn version_header(&self) -> Option<&str> {
        self.version_header.as_deref()
    }

    /// Static headers sent with every request.
    #[must_use]
    pub fn default_headers(&self) -> &BTreeMap<String, String> {
        &self.default_headers
    }

    /// Declared authentication mode.
    #[must_use]
    pub fn auth(&self) -> &AuthMode {
        &self.auth
    }

    /// Declared rate limit, if any.
    #[must_use]
    pub fn rate_limit(&self) -> Option<RateLimit> {
        self.rate_limit
    }

    /// Path prefixes that must never be called.
    #[must_use]
    pub fn blocklist(&self) -> &[String] {
        &self.blocklist
    }

    /// All declared operations.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Looks up an operation by id.
    #[must_use]
    pub fn operation(&self, id: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id == id)
    }

    /// Returns the blocklist entry matching `resolved_path`, if any.
    ///
    /// Matching respects path-segment boundaries: `/admin` blocks `/admin`
    /// and `/admin/users` but not `/administrators`.
    #[must_use]
    pub fn blocked_prefix(&self, resolved_path: &str) -> Option<&str> {
        let path = resolved_path.split('?').next().unwrap_or(resolved_path);
        self.blocklist
            .iter()
            .map(|prefix| prefix.trim_end_matches('/'))
            .find(|prefix| {
                prefix.is_empty()
                    || path == *prefix
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
    }
}

/// Authentication scheme a provider expects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AuthMode {
    /// No credential is attached.
    None,
    /// `Authorization: Bearer <token>`.
    #[default]
    Bearer,
    /// HTTP basic auth; the credential is `user:password` or a bare key used
    /// as the username.
    Basic,
    /// The credential is sent verbatim in a custom header.
    Header {
        /// Header name, e.g. `X-Api-Key`.
        name: String,
    },
    /// The credential is sent as a query parameter.
    Query {
        /// Query parameter name.
        param: String,
    },
}

/// Requests permitted per window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    /// Requests allowed per window.
    pub requests: u32,
    /// Window length in seconds.
    pub window_seconds: u64,
}

impl RateLimit {
    /// Returns the window as a [`Duration`].
    #[must_use]
    pub const fn window(self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

/// HTTP method of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Returns the method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Returns `true` when non-path params travel in a JSON body rather than
    /// the query string.
    #[must_use]
    pub const fn carries_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

/// One callable action within a manifest.
///
/// The `id` is part of the public tool name; altering it is a breaking change.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    id: String,
    method: HttpMethod,
    path: String,
    access: Access,
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    params: Vec<ParamSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    body: Vec<ParamSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    response_hints: Vec<String>,
}

impl Operation {
    /// Operation id, unique within its manifest.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Path template with `{name}` placeholders.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Declared access class.
    #[must_use]
    pub fn access(&self) -> Access {
        self.access
    }

    /// Free-text description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared parameters (path, query, or body-merged).
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Declared body fields.
    #[must_use]
    pub fn body(&self) -> &[ParamSpec] {
        &self.body
    }

    /// Advisory field names used when summarising responses.
    #[must_use]
    pub fn response_hints(&self) -> &[String] {
        &self.response_hints
    }

    /// Names referenced by `{placeholder}`s in the path template.
    #[must_use]
    pub fn path_placeholders(&self) -> Vec<&str> {
        path::placeholders(&self.path).unwrap_or_default()
    }

    /// Iterates params and body fields together, params first.
    pub fn inputs(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().chain(self.body.iter())
    }
}

/// JSON type of a parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// JSON string.
    #[default]
    String,
    /// Integral JSON number.
    Integer,
    /// Any JSON number.
    Number,
    /// JSON boolean.
    Boolean,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
}

impl ParamType {
    /// JSON-Schema type keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Returns `true` when `value` has this JSON type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    /// Returns `true` for array and object types.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Array | Self::Object)
    }
}

/// Serialization convention for structured values placed in a query string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamStyle {
    /// `key=a,b,c`
    Csv,
    /// `key=a&key=b`
    Repeat,
    /// `key[]=a&key[]=b`
    Brackets,
    /// `key=<json>`
    Json,
}

/// Named, typed input of an operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    name: String,
    #[serde(rename = "type", default)]
    kind: ParamType,
    #[serde(default)]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    allowed: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    items: Option<ParamType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    style: Option<ParamStyle>,
}

impl ParamSpec {
    /// Parameter name as sent to the provider.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared JSON type.
    #[must_use]
    pub fn kind(&self) -> ParamType {
        self.kind
    }

    /// Whether callers must supply the parameter.
    #[must_use]
    pub fn required(&self) -> bool {
        self.required
    }

    /// Optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Allowed values; empty means unrestricted.
    #[must_use]
    pub fn allowed(&self) -> &[Value] {
        &self.allowed
    }

    /// Optional format hint (e.g. `date-time`, `email`).
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Default applied when an optional parameter is omitted.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Element type of array parameters.
    #[must_use]
    pub fn items(&self) -> Option<ParamType> {
        self.items
    }

    /// Query serialization convention for structured values.
    #[must_use]
    pub fn style(&self) -> Option<ParamStyle> {
        self.style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "provider": "ats",
        "displayName": "Example ATS",
        "category": "ats",
        "baseUrl": "https://api.example.com/v1/",
        "auth": {"mode": "header", "name": "X-Api-Key"},
        "rateLimit": {"requests": 10, "windowSeconds": 1},
        "blocklist": ["/admin"],
        "operations": [
            {
                "id": "get_candidate",
                "method": "GET",
                "path": "/candidates/{candidate_id}",
                "access": "read",
                "params": [{"name": "candidate_id", "type": "string", "required": true}],
                "responseHints": ["name", "email"]
            }
        ]
    }"#;

    #[test]
    fn parses_camel_case_manifest() {
        let manifest = Manifest::from_json_str(SAMPLE).expect("manifest");
        assert_eq!(manifest.provider().as_str(), "ats");
        assert_eq!(manifest.base_url(), "https://api.example.com/v1");
        assert_eq!(
            manifest.auth(),
            &AuthMode::Header {
                name: "X-Api-Key".into()
            }
        );
        assert_eq!(manifest.rate_limit().unwrap().window(), Duration::from_secs(1));

        let op = manifest.operation("get_candidate").expect("operation");
        assert_eq!(op.method(), HttpMethod::Get);
        assert_eq!(op.access(), Access::Read);
        assert_eq!(op.path_placeholders(), ["candidate_id"]);
        assert_eq!(op.response_hints(), ["name", "email"]);
    }

    #[test]
    fn blocklist_respects_segment_boundaries() {
        let manifest = Manifest::from_json_str(SAMPLE).unwrap();
        assert_eq!(manifest.blocked_prefix("/admin"), Some("/admin"));
        assert_eq!(manifest.blocked_prefix("/admin/users?x=1"), Some("/admin"));
        assert_eq!(manifest.blocked_prefix("/administrators"), None);
        assert_eq!(manifest.blocked_prefix("/candidates/1"), None);
    }

    #[test]
    fn param_type_matching() {
        assert!(ParamType::Integer.matches(&serde_json::json!(3)));
        assert!(!ParamType::Integer.matches(&serde_json::json!(3.5)));
        assert!(ParamType::Number.matches(&serde_json::json!(3.5)));
        assert!(ParamType::Array.matches(&serde_json::json!([1])));
        assert!(!ParamType::String.matches(&serde_json::json!(null)));
    }
}
