use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: ErrorBody },

    #[error("Session expired - please log in again")]
    AuthExpired { body: ErrorBody },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Credential storage error: {0}")]
    Credentials(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Map a transport failure to `Timeout` or `Network`.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err)
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        ApiError::Http {
            status,
            body: ErrorBody::parse(body),
        }
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::AuthExpired { .. } => Some(StatusCode::UNAUTHORIZED),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            ApiError::Http { body, .. } | ApiError::AuthExpired { body } => Some(body),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// True when the caller must re-authenticate before trying again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ApiError::AuthExpired { .. })
    }
}

/// Decoded error payload returned by the server.
///
/// The backend answers errors in a handful of shapes: `{"detail": "..."}`,
/// `{"non_field_errors": [...]}`, per-field validation maps such as
/// `{"username": ["taken"]}`, or a bare string. The body is decoded once here
/// so callers never have to probe nested optional paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorBody {
    raw: Option<Value>,
}

impl ErrorBody {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::default();
        }
        let raw = serde_json::from_str(trimmed)
            .unwrap_or_else(|_| Value::String(truncate_body(trimmed)));
        Self { raw: Some(raw) }
    }

    pub fn from_value(value: Value) -> Self {
        Self { raw: Some(value) }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_none()
    }

    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    pub fn detail(&self) -> Option<&str> {
        self.raw.as_ref()?.get("detail").and_then(first_message)
    }

    pub fn non_field_errors(&self) -> Option<&str> {
        self.raw.as_ref()?.get("non_field_errors").and_then(first_message)
    }

    /// Generic `error` field used by some custom views.
    pub fn error(&self) -> Option<&str> {
        self.raw.as_ref()?.get("error").and_then(first_message)
    }

    /// A body that was plain text rather than a JSON object.
    pub fn text(&self) -> Option<&str> {
        self.raw.as_ref()?.as_str()
    }

    /// First message per field for validation responses shaped as
    /// `{field: [messages...]}`. `detail` and `non_field_errors` are not fields.
    pub fn field_errors(&self) -> BTreeMap<String, String> {
        let Some(Value::Object(map)) = self.raw.as_ref() else {
            return BTreeMap::new();
        };
        map.iter()
            .filter(|(field, _)| !matches!(field.as_str(), "detail" | "non_field_errors"))
            .filter_map(|(field, value)| {
                first_message(value).map(|msg| (field.clone(), msg.to_string()))
            })
            .collect()
    }

    /// Best single human-readable message in the body.
    pub fn message(&self) -> Option<String> {
        self.detail()
            .or_else(|| self.non_field_errors())
            .or_else(|| self.error())
            .or_else(|| self.text())
            .map(str::to_string)
            .or_else(|| self.field_errors().into_values().next())
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) => write!(f, "{}", truncate_body(&msg)),
            None => match &self.raw {
                Some(raw) => write!(f, "{}", truncate_body(&raw.to_string())),
                None => write!(f, "(empty body)"),
            },
        }
    }
}

fn first_message(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items.first().and_then(Value::as_str),
        _ => None,
    }
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_takes_precedence() {
        let body = ErrorBody::parse(r#"{"detail": "Token is invalid", "error": "other"}"#);
        assert_eq!(body.detail(), Some("Token is invalid"));
        assert_eq!(body.message().as_deref(), Some("Token is invalid"));
    }

    #[test]
    fn test_field_errors_take_first_message() {
        let body = ErrorBody::parse(
            r#"{"username": ["A user with that username already exists.", "x"], "email": "bad", "non_field_errors": ["Passwords do not match"]}"#,
        );
        let fields = body.field_errors();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["username"], "A user with that username already exists.");
        assert_eq!(fields["email"], "bad");
        assert_eq!(body.non_field_errors(), Some("Passwords do not match"));
        assert_eq!(body.message().as_deref(), Some("Passwords do not match"));
    }

    #[test]
    fn test_plain_text_and_empty_bodies() {
        let body = ErrorBody::parse("Bad Gateway");
        assert_eq!(body.text(), Some("Bad Gateway"));
        assert_eq!(body.message().as_deref(), Some("Bad Gateway"));

        let empty = ErrorBody::parse("   ");
        assert!(empty.is_empty());
        assert_eq!(empty.message(), None);
        assert_eq!(empty.to_string(), "(empty body)");
    }

    #[test]
    fn test_truncates_long_bodies() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 50);
        let truncated = truncate_body(&long);
        assert!(truncated.contains("truncated"));
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
    }

    #[test]
    fn test_status_accessors() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"detail": "Not found."}"#);
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert!(!err.is_unauthorized());
        assert_eq!(err.body().and_then(ErrorBody::detail), Some("Not found."));

        let expired = ApiError::AuthExpired { body: ErrorBody::default() };
        assert!(expired.is_unauthorized());
        assert!(expired.is_auth_expired());
        assert!(ApiError::Timeout.status().is_none());
    }
}
