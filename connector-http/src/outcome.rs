//! Response classification and summarisation.

use std::time::Duration;

use bytes::Bytes;
use http::header::RETRY_AFTER;
use http::{Response, StatusCode};
use serde_json::{Map, Value};

use crate::error::{ExecutionError, ExecutionResult};

const EXCERPT_CHARS: usize = 200;

/// Decoded response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// No content.
    Empty,
    /// JSON document.
    Json(Value),
    /// Anything else, lossily decoded as UTF-8.
    Text(String),
}

/// Successful result of one operation call.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    status: u16,
    body: ResponseBody,
    response_hints: Vec<String>,
}

impl ExecutionOutcome {
    /// Creates an outcome.
    #[must_use]
    pub fn new(status: u16, body: ResponseBody, response_hints: Vec<String>) -> Self {
        Self {
            status,
            body,
            response_hints,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Raw decoded body.
    #[must_use]
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Advisory field names declared by the operation.
    #[must_use]
    pub fn response_hints(&self) -> &[String] {
        &self.response_hints
    }

    /// Short text rendering for the calling agent.
    ///
    /// Hints are advisory: when none of them resolve, the full body is shown.
    #[must_use]
    pub fn summary(&self, max_chars: usize) -> String {
        let text = match &self.body {
            ResponseBody::Empty => {
                return format!("Request succeeded (HTTP {}) with no content.", self.status);
            }
            ResponseBody::Text(text) if text.trim().is_empty() => {
                return format!("Request succeeded (HTTP {}) with no content.", self.status);
            }
            ResponseBody::Text(text) => text.clone(),
            ResponseBody::Json(Value::Array(items)) if items.is_empty() => {
                return "No results.".to_owned();
            }
            ResponseBody::Json(value) => {
                let shown = project(value, &self.response_hints).unwrap_or_else(|| value.clone());
                serde_json::to_string_pretty(&shown).unwrap_or_else(|_| shown.to_string())
            }
        };
        truncate(&text, max_chars)
    }
}

/// Turns a buffered response into an outcome or a classified error.
pub(crate) fn classify(
    provider: &str,
    path: &str,
    response: Response<Bytes>,
    hints: &[String],
) -> ExecutionResult<ExecutionOutcome> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let bytes = response.into_body();

    if status.is_success() {
        return Ok(ExecutionOutcome::new(
            status.as_u16(),
            decode(&bytes),
            hints.to_vec(),
        ));
    }

    let excerpt = truncate(String::from_utf8_lossy(&bytes).trim(), EXCERPT_CHARS);
    let provider = provider.to_owned();
    Err(match status {
        StatusCode::UNAUTHORIZED => ExecutionError::CredentialExpired { provider },
        StatusCode::FORBIDDEN if retry_after.is_some() => ExecutionError::RateLimited {
            provider,
            retry_after,
        },
        StatusCode::FORBIDDEN => ExecutionError::PermissionDenied {
            provider,
            reason: excerpt,
        },
        StatusCode::NOT_FOUND => ExecutionError::NotFound {
            path: path.to_owned(),
        },
        StatusCode::TOO_MANY_REQUESTS => ExecutionError::RateLimited {
            provider,
            retry_after,
        },
        other => ExecutionError::Upstream {
            provider,
            status: other.as_u16(),
            reason: excerpt,
        },
    })
}

fn decode(bytes: &Bytes) -> ResponseBody {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return ResponseBody::Empty;
    }
    serde_json::from_slice::<Value>(bytes).map_or_else(
        |_| ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned()),
        ResponseBody::Json,
    )
}

/// Keeps only hinted fields. Hints may be dotted (`files.id`); arrays are
/// mapped element-wise.
fn project(value: &Value, hints: &[String]) -> Option<Value> {
    if hints.is_empty() {
        return None;
    }
    match value {
        Value::Array(items) => {
            let rows: Vec<Value> = items
                .iter()
                .filter_map(|item| pick(item, hints))
                .collect();
            (!rows.is_empty()).then_some(Value::Array(rows))
        }
        other => pick(other, hints),
    }
}

fn pick(value: &Value, hints: &[String]) -> Option<Value> {
    let mut out = Map::new();
    for hint in hints {
        let segments: Vec<&str> = hint.split('.').collect();
        if let Some(found) = lookup(value, &segments) {
            out.insert(hint.clone(), found);
        }
    }
    (!out.is_empty()).then_some(Value::Object(out))
}

fn lookup(value: &Value, segments: &[&str]) -> Option<Value> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(value.clone());
    };
    match value {
        Value::Object(fields) => fields.get(*first).and_then(|v| lookup(v, rest)),
        Value::Array(items) => {
            let found: Vec<Value> = items.iter().filter_map(|v| lookup(v, segments)).collect();
            (!found.is_empty()).then_some(Value::Array(found))
        }
        _ => None,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str(&format!("\n... (truncated, {total} characters total)"));
    out
}

#[cfg(test)]
mod tests {
    use http::header::CONTENT_TYPE;
    use serde_json::json;

    use super::*;

    fn response(status: u16, body: &str) -> Response<Bytes> {
        Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from(body.to_owned()))
            .unwrap()
    }

    #[test]
    fn status_codes_are_classified() {
        let err = classify("github", "/x", response(401, "{}"), &[]).unwrap_err();
        assert!(matches!(err, ExecutionError::CredentialExpired { .. }));

        let err = classify("github", "/x", response(403, "nope"), &[]).unwrap_err();
        assert!(matches!(err, ExecutionError::PermissionDenied { reason, .. } if reason == "nope"));

        let err = classify("github", "/x", response(404, ""), &[]).unwrap_err();
        assert!(matches!(err, ExecutionError::NotFound { path } if path == "/x"));

        let err = classify("github", "/x", response(500, "boom"), &[]).unwrap_err();
        assert!(matches!(err, ExecutionError::Upstream { status: 500, .. }));
    }

    #[test]
    fn retry_after_is_parsed() {
        let limited = Response::builder()
            .status(429)
            .header(RETRY_AFTER, "7")
            .body(Bytes::new())
            .unwrap();
        let err = classify("lever", "/x", limited, &[]).unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::RateLimited { retry_after: Some(d), .. } if d == Duration::from_secs(7)
        ));
    }

    #[test]
    fn summary_projects_hints_over_arrays() {
        let outcome = ExecutionOutcome::new(
            200,
            ResponseBody::Json(json!([
                {"number": 1, "title": "Bug", "body": "long text"},
                {"number": 2, "title": "Feature", "body": "more text"}
            ])),
            vec!["number".into(), "title".into()],
        );
        let summary = outcome.summary(1000);
        assert!(summary.contains("\"Bug\""));
        assert!(!summary.contains("long text"));
    }

    #[test]
    fn dotted_hints_walk_nested_arrays() {
        let body = json!({"files": [{"id": "a", "name": "x"}, {"id": "b", "name": "y"}]});
        let projected = project(&body, &["files.id".to_owned()]).unwrap();
        assert_eq!(projected, json!({"files.id": ["a", "b"]}));
    }

    #[test]
    fn unresolved_hints_fall_back_to_full_body() {
        let outcome = ExecutionOutcome::new(
            200,
            ResponseBody::Json(json!({"id": 5})),
            vec!["missing".into()],
        );
        assert!(outcome.summary(1000).contains("\"id\": 5"));
    }

    #[test]
    fn empty_list_and_empty_body_read_as_success() {
        let empty = ExecutionOutcome::new(200, ResponseBody::Json(json!([])), vec![]);
        assert_eq!(empty.summary(100), "No results.");

        let none = ExecutionOutcome::new(204, ResponseBody::Empty, vec![]);
        assert!(none.summary(100).contains("no content"));
    }

    #[test]
    fn long_text_is_truncated_on_char_boundaries() {
        let outcome = ExecutionOutcome::new(200, ResponseBody::Text("é".repeat(50)), vec![]);
        let summary = outcome.summary(10);
        assert!(summary.starts_with(&"é".repeat(10)));
        assert!(summary.contains("truncated, 50 characters total"));
    }
}
