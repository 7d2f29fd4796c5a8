//! API client for communicating with the HabitFlow REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests. Every request carries the latest access token. A 401 answer
//! triggers a single, serialized token refresh followed by one replay of
//! the original request.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{header, Client, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::{CredentialStore, MemoryCredentialStore, Navigator, RouteTracker, TokenKey, LOGIN_ROUTE};
use crate::config::Config;
use crate::models::{AuthResponse, LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest};

use super::{ApiError, ErrorBody};

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "auth/login/";
const REGISTER_PATH: &str = "auth/register/";
const REFRESH_PATH: &str = "auth/refresh/";

/// HTTP request timeout used when the builder is not given one.
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(crate::config::DEFAULT_TIMEOUT_MS);

const REQUESTED_WITH: &str = "x-requested-with";

/// Ensure the base URL ends in exactly one slash so relative resource paths
/// join onto it.
pub fn normalize_base_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ApiError::InvalidRequest("API base URL is empty".to_string()));
    }
    let normalized = format!("{}/", trimmed);
    Url::parse(&normalized)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid API base URL {}: {}", raw, e)))?;
    Ok(normalized)
}

/// Logical authentication state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    RefreshInFlight,
}

/// Extra per-request settings: query string pairs and headers.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    query: Vec<(String, String)>,
    headers: header::HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: header::HeaderName, value: header::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// An outbound request kept around so it can be replayed after a refresh.
#[derive(Debug, Clone)]
struct PendingRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    options: RequestOptions,
    /// Set once the request has been through a refresh; a second 401 is final.
    retried: bool,
    /// Login and register answer 401 for bad credentials, not expired tokens.
    refreshable: bool,
}

impl PendingRequest {
    fn new(method: Method, path: &str, body: Option<Value>, options: RequestOptions) -> Self {
        Self {
            method,
            path: path.to_string(),
            body,
            options,
            retried: false,
            refreshable: true,
        }
    }

    fn without_refresh(mut self) -> Self {
        self.refreshable = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Refreshed,
    Failed,
}

/// Result of the most recent refresh cycle, guarded by the refresh lock.
#[derive(Debug, Default)]
struct RefreshCycle {
    last: Option<RefreshOutcome>,
}

/// Raises the in-flight flag for as long as it is alive, so a refresh whose
/// caller is dropped mid-await still lowers it.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Inner {
    /// Client used for every application request
    http: Client,
    /// Bare client for `auth/refresh/`, never routed through the 401 handling
    refresh_http: Client,
    base_url: String,
    default_token: RwLock<Option<String>>,
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    refresh: Mutex<RefreshCycle>,
    /// Bumped after every completed refresh cycle
    epoch: AtomicU64,
    refreshing: AtomicBool,
}

/// API client for HabitFlow.
/// Clone is cheap - all clones share one connection pool and one credential state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    store: Option<Arc<dyn CredentialStore>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ApiClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        let base_url = normalize_base_url(
            self.base_url
                .as_deref()
                .unwrap_or(crate::config::DEFAULT_API_URL),
        )?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let refresh_headers = headers.clone();
        headers.insert(REQUESTED_WITH, header::HeaderValue::from_static("XMLHttpRequest"));

        let http = Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to build HTTP client: {}", e)))?;

        let refresh_http = Client::builder()
            .timeout(self.timeout)
            .default_headers(refresh_headers)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to build HTTP client: {}", e)))?;

        debug!(base_url = %base_url, timeout_ms = self.timeout.as_millis() as u64, "API client configured");

        Ok(ApiClient {
            inner: Arc::new(Inner {
                http,
                refresh_http,
                base_url,
                default_token: RwLock::new(None),
                store: self
                    .store
                    .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new())),
                navigator: self
                    .navigator
                    .unwrap_or_else(|| Arc::new(RouteTracker::default())),
                refresh: Mutex::new(RefreshCycle::default()),
                epoch: AtomicU64::new(0),
                refreshing: AtomicBool::new(false),
            }),
        })
    }
}

impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            store: None,
            navigator: None,
        }
    }

    /// Create a client against `base_url` with an in-memory credential store
    pub fn configure(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Self::builder().base_url(base_url).timeout(timeout).build()
    }

    /// Create a client from application configuration
    pub fn from_config(
        config: &Config,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        Self::builder()
            .base_url(config.api_url())
            .timeout(config.timeout())
            .credential_store(store)
            .navigator(navigator)
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn credential_store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    // ===== Token management =====

    /// Install the default bearer token; `None` or an empty token removes it
    pub fn set_token(&self, token: Option<&str>) {
        if let Ok(mut current) = self.inner.default_token.write() {
            *current = token.filter(|t| !t.is_empty()).map(str::to_string);
        }
    }

    /// Remove the default bearer token. Persisted credentials are untouched.
    pub fn clear_token(&self) {
        self.set_token(None);
    }

    pub fn installed_token(&self) -> Option<String> {
        self.inner
            .default_token
            .read()
            .ok()
            .and_then(|t| t.clone())
    }

    pub fn state(&self) -> SessionState {
        if self.inner.refreshing.load(Ordering::Acquire) {
            SessionState::RefreshInFlight
        } else if self.current_token().is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    fn stored_token(&self, key: TokenKey) -> Option<String> {
        match self.inner.store.get(key) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "Failed to read credential store");
                None
            }
        }
    }

    /// Latest stored access token, falling back to the installed default
    fn current_token(&self) -> Option<String> {
        self.stored_token(TokenKey::Access)
            .or_else(|| self.installed_token())
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.current_token() {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidRequest("Access token is not a valid header value".to_string()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    // ===== Generic verbs =====

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get_with(path, RequestOptions::default()).await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.execute(PendingRequest::new(Method::GET, path, None, options))
            .await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.post_with(path, body, RequestOptions::default()).await
    }

    pub async fn post_with<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let body = Self::encode(body)?;
        self.execute(PendingRequest::new(Method::POST, path, Some(body), options))
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.patch_with(path, body, RequestOptions::default()).await
    }

    pub async fn patch_with<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let body = Self::encode(body)?;
        self.execute(PendingRequest::new(Method::PATCH, path, Some(body), options))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.delete_with(path, RequestOptions::default()).await
    }

    pub async fn delete_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.execute(PendingRequest::new(Method::DELETE, path, None, options))
            .await
    }

    /// DELETE carrying a JSON body, e.g. `users/follow/`
    pub async fn delete_with_body<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = Self::encode(body)?;
        self.execute(PendingRequest::new(
            Method::DELETE,
            path,
            Some(body),
            RequestOptions::default(),
        ))
        .await
    }

    // ===== Auth endpoints =====

    /// Exchange credentials for tokens. Nothing is persisted here; the
    /// session layer decides what to store.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = Self::encode(&LoginRequest { username, password })?;
        self.execute(
            PendingRequest::new(Method::POST, LOGIN_PATH, Some(body), RequestOptions::default())
                .without_refresh(),
        )
        .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let body = Self::encode(request)?;
        self.execute(
            PendingRequest::new(Method::POST, REGISTER_PATH, Some(body), RequestOptions::default())
                .without_refresh(),
        )
        .await
    }

    /// Call `auth/refresh/` on the bare client. Does not touch stored state.
    pub async fn refresh_access(&self, refresh: &str) -> Result<RefreshResponse, ApiError> {
        let response = self
            .inner
            .refresh_http
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh })
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        Self::decode(response).await
    }

    // ===== Request pipeline =====

    async fn send(&self, request: &PendingRequest) -> Result<reqwest::Response, ApiError> {
        let url = self.url(&request.path);
        debug!(method = %request.method, url = %url, retried = request.retried, "Sending request");

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), &url)
            .headers(self.auth_headers()?)
            .headers(request.options.headers.clone());

        if !request.options.query.is_empty() {
            builder = builder.query(&request.options.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(ApiError::from_transport)
    }

    /// Run a request through the 401 state machine: send, and on an
    /// authorization failure refresh once and replay once.
    async fn execute<T: DeserializeOwned>(&self, mut request: PendingRequest) -> Result<T, ApiError> {
        loop {
            let epoch = self.inner.epoch.load(Ordering::Acquire);
            let response = self.send(&request).await?;

            if response.status() != StatusCode::UNAUTHORIZED || !request.refreshable {
                return Self::decode(response).await;
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %request.path, error = %e, "Failed to read 401 response body");
                    String::new()
                }
            };
            let body = ErrorBody::parse(&text);

            if request.retried {
                warn!(path = %request.path, "Replayed request rejected again, giving up");
                return Err(ApiError::AuthExpired { body });
            }
            request.retried = true;

            if self.recover(epoch).await == RefreshOutcome::Failed {
                return Err(ApiError::AuthExpired { body });
            }
            debug!(path = %request.path, "Replaying request after token refresh");
        }
    }

    /// Serialize refresh attempts. A caller whose 401 predates an already
    /// completed cycle reuses that cycle's outcome instead of refreshing again.
    async fn recover(&self, sent_epoch: u64) -> RefreshOutcome {
        let mut cycle = self.inner.refresh.lock().await;

        if self.inner.epoch.load(Ordering::Acquire) != sent_epoch {
            if let Some(outcome) = cycle.last {
                debug!(?outcome, "Reusing outcome of concurrent refresh");
                return outcome;
            }
        }

        let in_flight = InFlight::raise(&self.inner.refreshing);
        let outcome = match self.try_refresh().await {
            Ok(()) => {
                info!("Access token refreshed");
                RefreshOutcome::Refreshed
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                self.expire_session();
                RefreshOutcome::Failed
            }
        };

        cycle.last = Some(outcome);
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
        drop(in_flight);
        outcome
    }

    async fn try_refresh(&self) -> Result<(), ApiError> {
        let refresh = self
            .stored_token(TokenKey::Refresh)
            .ok_or_else(|| ApiError::Credentials("No refresh token stored".to_string()))?;

        let response = self.refresh_access(&refresh).await?;
        let access = response
            .access
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("Refresh response missing access token".to_string()))?;

        let store = &self.inner.store;
        store
            .set(TokenKey::Access, &access)
            .map_err(|e| ApiError::Credentials(e.to_string()))?;
        if let Some(rotated) = response.refresh.filter(|t| !t.is_empty()) {
            store
                .set(TokenKey::Refresh, &rotated)
                .map_err(|e| ApiError::Credentials(e.to_string()))?;
        }
        self.set_token(Some(&access));
        Ok(())
    }

    /// Erase all credentials and send the user to the login screen
    fn expire_session(&self) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to erase stored credentials");
        }
        self.clear_token();

        let navigator = &self.inner.navigator;
        if navigator.current_route() != LOGIN_ROUTE {
            navigator.redirect_to_login();
        }
    }

    fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
        serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode request body: {}", e)))
    }

    /// Decode a successful body (empty decodes as `null`), or turn a non-2xx
    /// answer into `ApiError::Http`.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let url = response.url().to_string();
        let text = response.text().await.map_err(ApiError::from_transport)?;

        if !status.is_success() {
            debug!(status = status.as_u16(), url = %url, "Request failed");
            return Err(ApiError::from_status(status, &text));
        }

        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://x/api").unwrap(), "http://x/api/");
        assert_eq!(normalize_base_url("http://x/api/").unwrap(), "http://x/api/");
        assert_eq!(normalize_base_url(" http://x/api// ").unwrap(), "http://x/api/");
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_url_joins_resource_paths() {
        let with_slash = ApiClient::configure("http://x/api/", DEFAULT_TIMEOUT).unwrap();
        let without = ApiClient::configure("http://x/api", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(with_slash.url("habits/"), "http://x/api/habits/");
        assert_eq!(without.url("habits/"), "http://x/api/habits/");
        // Leading slashes are relative to the base, not the host root
        assert_eq!(without.url("/users/badges/"), "http://x/api/users/badges/");
    }

    #[test]
    fn test_state_follows_stored_token() {
        let client = ApiClient::builder()
            .base_url("http://x/api")
            .credential_store(Arc::new(MemoryCredentialStore::with_tokens("a1", "r1")))
            .build()
            .unwrap();
        assert_eq!(client.installed_token(), None);
        assert_eq!(client.state(), SessionState::Authenticated);
    }

    #[test]
    fn test_in_flight_flag_lowers_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = InFlight::raise(&flag);
            assert!(flag.load(Ordering::Acquire));
        }
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn test_set_and_clear_token() {
        let client = ApiClient::configure("http://x/api", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.installed_token(), None);
        assert_eq!(client.state(), SessionState::Unauthenticated);

        client.set_token(Some("t"));
        assert_eq!(client.installed_token().as_deref(), Some("t"));
        assert_eq!(client.state(), SessionState::Authenticated);

        client.clear_token();
        assert_eq!(client.installed_token(), None);

        client.set_token(Some("t"));
        client.set_token(Some(""));
        assert_eq!(client.installed_token(), None);
    }

    #[test]
    fn test_auth_headers_prefer_stored_token() {
        let store = Arc::new(MemoryCredentialStore::new());
        let client = ApiClient::builder()
            .base_url("http://x/api")
            .credential_store(store.clone())
            .build()
            .unwrap();

        assert!(client.auth_headers().unwrap().get(header::AUTHORIZATION).is_none());

        client.set_token(Some("installed"));
        assert_eq!(
            client.auth_headers().unwrap()[header::AUTHORIZATION],
            "Bearer installed"
        );

        store.set(TokenKey::Access, "stored").unwrap();
        assert_eq!(
            client.auth_headers().unwrap()[header::AUTHORIZATION],
            "Bearer stored"
        );
    }

    #[test]
    fn test_request_options() {
        let options = RequestOptions::new()
            .query("q", "sam")
            .query("page", 2)
            .header(header::ACCEPT_LANGUAGE, header::HeaderValue::from_static("en"));
        assert_eq!(options.query, vec![("q".to_string(), "sam".to_string()), ("page".to_string(), "2".to_string())]);
        assert_eq!(options.headers[header::ACCEPT_LANGUAGE], "en");
    }
}
