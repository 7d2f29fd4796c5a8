#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use habitflow_core::auth::{MemoryCredentialStore, Navigator, LOGIN_ROUTE};
use habitflow_core::ApiClient;
use wiremock::MockServer;

/// Navigator that counts redirects instead of showing anything.
pub struct CountingNavigator {
    route: RwLock<String>,
    redirects: AtomicUsize,
}

impl CountingNavigator {
    pub fn at(route: &str) -> Arc<Self> {
        Arc::new(Self {
            route: RwLock::new(route.to_string()),
            redirects: AtomicUsize::new(0),
        })
    }

    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for CountingNavigator {
    fn current_route(&self) -> String {
        self.route.read().unwrap().clone()
    }

    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
        *self.route.write().unwrap() = LOGIN_ROUTE.to_string();
    }
}

pub struct Harness {
    pub server: MockServer,
    pub client: ApiClient,
    pub store: Arc<MemoryCredentialStore>,
    pub navigator: Arc<CountingNavigator>,
}

pub async fn harness(store: MemoryCredentialStore) -> Harness {
    harness_with_timeout(store, Duration::from_secs(5)).await
}

pub async fn harness_with_timeout(store: MemoryCredentialStore, timeout: Duration) -> Harness {
    let server = MockServer::start().await;
    let store = Arc::new(store);
    let navigator = CountingNavigator::at("/habits");
    let client = ApiClient::builder()
        .base_url(format!("{}/api", server.uri()))
        .timeout(timeout)
        .credential_store(store.clone())
        .navigator(navigator.clone())
        .build()
        .unwrap();

    Harness {
        server,
        client,
        store,
        navigator,
    }
}

/// Authorization header of every received request to `path`
pub async fn auth_headers_for(server: &MockServer, path: &str) -> Vec<Option<String>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == path)
        .map(|r| {
            r.headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .collect()
}
