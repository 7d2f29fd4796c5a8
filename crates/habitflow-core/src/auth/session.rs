use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{AuthResponse, RegisterRequest, User};

const MISSING_TOKENS: &str = "Invalid response from server - missing tokens";
const LOGIN_FALLBACK: &str = "Login failed. Please check your credentials.";
const REGISTER_INVALID: &str = "Registration failed. Please check your information.";
const REGISTER_FALLBACK: &str = "Registration failed. Please try again.";

/// A failed login or registration, already reduced to what a form shows.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct AuthFailure {
    pub message: String,
    /// First validation message per field, for inline form errors
    pub field_errors: BTreeMap<String, String>,
    #[source]
    pub source: Option<ApiError>,
}

impl AuthFailure {
    fn missing_tokens() -> Self {
        Self {
            message: MISSING_TOKENS.to_string(),
            field_errors: BTreeMap::new(),
            source: None,
        }
    }

    /// Message precedence: `detail`, `non_field_errors`, `error`, plain-text
    /// body, then the transport error itself.
    fn from_login_error(err: ApiError) -> Self {
        let message = match err.body().filter(|b| !b.is_empty()) {
            Some(body) => body
                .detail()
                .or_else(|| body.non_field_errors())
                .or_else(|| body.error())
                .or_else(|| body.text())
                .unwrap_or(LOGIN_FALLBACK)
                .to_string(),
            None => err.to_string(),
        };
        Self {
            message,
            field_errors: BTreeMap::new(),
            source: Some(err),
        }
    }

    fn from_register_error(err: ApiError) -> Self {
        let body = err.body().filter(|b| b.raw().is_some_and(Value::is_object));
        let (message, field_errors) = match body {
            Some(body) => {
                let field_errors = body.field_errors();
                let message = body
                    .detail()
                    .or_else(|| body.non_field_errors())
                    .map(str::to_string)
                    .or_else(|| field_errors.values().next().cloned())
                    .unwrap_or_else(|| REGISTER_INVALID.to_string());
                (message, field_errors)
            }
            None => {
                let message = err
                    .body()
                    .and_then(|b| b.detail().map(str::to_string))
                    .unwrap_or_else(|| err.to_string());
                let message = if message.is_empty() {
                    REGISTER_FALLBACK.to_string()
                } else {
                    message
                };
                (message, BTreeMap::new())
            }
        };
        Self {
            message,
            field_errors,
            source: Some(err),
        }
    }
}

/// Coordinates login, registration and logout state on top of the API
/// client and its credential store. Constructed once and shared.
pub struct AuthSession {
    api: ApiClient,
    user: RwLock<Option<Value>>,
    last_error: RwLock<Option<String>>,
}

impl AuthSession {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            user: RwLock::new(None),
            last_error: RwLock::new(None),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Restore a persisted session on startup.
    ///
    /// If an access token is stored it is installed and `users/me/` is
    /// fetched. Any failure erases the stored tokens.
    pub async fn restore(&self) -> Option<User> {
        let store = self.api.credential_store();
        let token = match store.access_token() {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored credentials");
                self.erase_credentials();
                return None;
            }
        };

        self.api.set_token(Some(&token));
        match self.api.get::<Value>("users/me/").await {
            Ok(raw) => {
                let user = serde_json::from_value::<User>(raw.clone()).ok();
                self.set_user(Some(raw));
                info!("Restored saved session");
                user
            }
            Err(e) => {
                warn!(error = %e, "Failed to get current user, clearing saved session");
                self.erase_credentials();
                None
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Option<User>, AuthFailure> {
        self.set_error(None);
        let result = match self.api.login(username, password).await {
            Ok(response) => self.establish(response),
            Err(e) => Err(AuthFailure::from_login_error(e)),
        };
        self.record(result)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<Option<User>, AuthFailure> {
        self.set_error(None);
        let result = match self.api.register(request).await {
            Ok(response) => self.establish(response),
            Err(e) => Err(AuthFailure::from_register_error(e)),
        };
        self.record(result)
    }

    /// Persist the tokens from a login/register response and install the
    /// access token.
    fn establish(&self, response: AuthResponse) -> Result<Option<User>, AuthFailure> {
        let (access, refresh) = response.tokens().ok_or_else(AuthFailure::missing_tokens)?;

        self.api
            .credential_store()
            .store_pair(access, refresh)
            .map_err(|e| AuthFailure {
                message: format!("Failed to store credentials: {}", e),
                field_errors: BTreeMap::new(),
                source: None,
            })?;
        self.api.set_token(Some(access));

        let user = response
            .user
            .as_ref()
            .and_then(|raw| serde_json::from_value::<User>(raw.clone()).ok());
        self.set_user(response.user);
        Ok(user)
    }

    fn record(&self, result: Result<Option<User>, AuthFailure>) -> Result<Option<User>, AuthFailure> {
        match &result {
            Ok(_) => debug!("Authentication succeeded"),
            Err(failure) => {
                warn!(error = %failure.message, "Authentication failed");
                self.set_error(Some(failure.message.clone()));
            }
        }
        result
    }

    pub fn logout(&self) {
        self.erase_credentials();
        self.set_user(None);
        self.set_error(None);
        info!("Logged out");
    }

    /// Shallow-merge fields into the cached user
    pub fn update_user(&self, patch: Value) {
        let Ok(mut user) = self.user.write() else {
            return;
        };
        match (&mut *user, patch) {
            (Some(Value::Object(current)), Value::Object(fields)) => current.extend(fields),
            (slot, patch) => *slot = Some(patch),
        }
    }

    /// The cached user as returned by the server
    pub fn user_raw(&self) -> Option<Value> {
        self.user.read().ok().and_then(|u| u.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.user_raw()
            .and_then(|raw| serde_json::from_value(raw).ok())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.read().map(|u| u.is_some()).unwrap_or(false)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().ok().and_then(|e| e.clone())
    }

    fn erase_credentials(&self) {
        if let Err(e) = self.api.credential_store().clear() {
            warn!(error = %e, "Failed to erase stored credentials");
        }
        self.api.clear_token();
    }

    fn set_user(&self, user: Option<Value>) {
        if let Ok(mut current) = self.user.write() {
            *current = user;
        }
    }

    fn set_error(&self, error: Option<String>) {
        if let Ok(mut current) = self.last_error.write() {
            *current = error;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorBody;
    use reqwest::StatusCode;
    use serde_json::json;

    fn http_error(status: u16, body: &str) -> ApiError {
        ApiError::from_status(StatusCode::from_u16(status).unwrap(), body)
    }

    #[test]
    fn test_login_message_precedence() {
        let f = AuthFailure::from_login_error(http_error(401, r#"{"detail": "No active account found with the given credentials"}"#));
        assert_eq!(f.message, "No active account found with the given credentials");

        let f = AuthFailure::from_login_error(http_error(400, r#"{"non_field_errors": ["Unable to log in"]}"#));
        assert_eq!(f.message, "Unable to log in");

        let f = AuthFailure::from_login_error(http_error(400, r#"{"error": "Account locked"}"#));
        assert_eq!(f.message, "Account locked");

        let f = AuthFailure::from_login_error(http_error(400, r#"{"username": ["This field is required."]}"#));
        assert_eq!(f.message, LOGIN_FALLBACK);

        let f = AuthFailure::from_login_error(ApiError::Timeout);
        assert_eq!(f.message, "Request timed out");
    }

    #[test]
    fn test_register_field_errors() {
        let f = AuthFailure::from_register_error(http_error(
            400,
            r#"{"username": ["A user with that username already exists."], "email": ["Enter a valid email address."]}"#,
        ));
        assert_eq!(f.field_errors.len(), 2);
        assert_eq!(f.field_errors["email"], "Enter a valid email address.");
        // BTreeMap order: email sorts before username
        assert_eq!(f.message, "Enter a valid email address.");

        let f = AuthFailure::from_register_error(http_error(400, r#"{"non_field_errors": ["Passwords do not match"]}"#));
        assert_eq!(f.message, "Passwords do not match");
        assert!(f.field_errors.is_empty());

        let f = AuthFailure::from_register_error(http_error(400, "{}"));
        assert_eq!(f.message, REGISTER_INVALID);
    }

    #[test]
    fn test_register_non_object_body() {
        let f = AuthFailure::from_register_error(ApiError::AuthExpired { body: ErrorBody::parse("nope") });
        assert_eq!(f.message, "Session expired - please log in again");
    }

    #[test]
    fn test_update_user_merges() {
        let api = ApiClient::configure("http://x/api", std::time::Duration::from_secs(1)).unwrap();
        let session = AuthSession::new(api);
        assert!(!session.is_authenticated());

        session.update_user(json!({"id": 1, "username": "sam", "bio": ""}));
        session.update_user(json!({"bio": "Runner"}));

        let raw = session.user_raw().unwrap();
        assert_eq!(raw["username"], "sam");
        assert_eq!(raw["bio"], "Runner");
        assert_eq!(session.user().unwrap().bio.as_deref(), Some("Runner"));
        assert!(session.is_authenticated());

        session.logout();
        assert!(!session.is_authenticated());
    }
}
