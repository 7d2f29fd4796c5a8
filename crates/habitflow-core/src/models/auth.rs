use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    /// Username or email; the backend accepts either
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl RegisterRequest {
    pub fn new(username: &str, email: &str, password: &str, password_confirm: &str) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            password_confirm: password_confirm.to_string(),
            first_name: None,
            last_name: None,
        }
    }
}

/// Response of `auth/login/` and `auth/register/`, returned verbatim.
///
/// Tokens are optional here so that a malformed response can be reported
/// as such by the session layer instead of failing to decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
}

impl AuthResponse {
    /// Both tokens, if present and non-empty
    pub fn tokens(&self) -> Option<(&str, &str)> {
        let access = self.access.as_deref().filter(|t| !t.is_empty())?;
        let refresh = self.refresh.as_deref().filter(|t| !t.is_empty())?;
        Some((access, refresh))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub access: Option<String>,
    /// Present when the backend rotates refresh tokens
    #[serde(default)]
    pub refresh: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_tokens() {
        let json = r#"{"access": "a1", "refresh": "r1", "user": {"id": 1, "username": "sam"}}"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.tokens(), Some(("a1", "r1")));
        assert_eq!(resp.user.unwrap()["username"], "sam");

        let missing: AuthResponse = serde_json::from_str(r#"{"access": "a1", "refresh": ""}"#).unwrap();
        assert_eq!(missing.tokens(), None);
    }

    #[test]
    fn test_register_request_omits_empty_names() {
        let req = RegisterRequest::new("sam", "sam@example.com", "pw", "pw");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["password_confirm"], "pw");
        assert!(json.get("first_name").is_none());
    }
}
