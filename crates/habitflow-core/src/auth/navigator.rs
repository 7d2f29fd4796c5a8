use std::sync::RwLock;

use tracing::warn;

/// Route of the login screen.
pub const LOGIN_ROUTE: &str = "/login";

/// Boundary to whatever presents screens to the user.
///
/// The API client only needs two things from the UI: where the user currently
/// is, and a way to send them to the login screen when the session cannot be
/// recovered.
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> String;

    fn redirect_to_login(&self);
}

/// Navigator that tracks the current route in memory and logs redirects.
#[derive(Debug)]
pub struct RouteTracker {
    route: RwLock<String>,
}

impl RouteTracker {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            route: RwLock::new(initial.into()),
        }
    }

    pub fn navigate(&self, route: impl Into<String>) {
        if let Ok(mut current) = self.route.write() {
            *current = route.into();
        }
    }
}

impl Default for RouteTracker {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for RouteTracker {
    fn current_route(&self) -> String {
        self.route
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn redirect_to_login(&self) {
        warn!(from = %self.current_route(), "Session expired, redirecting to login");
        self.navigate(LOGIN_ROUTE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_tracker_redirect() {
        let nav = RouteTracker::new("/habits");
        assert_eq!(nav.current_route(), "/habits");
        nav.redirect_to_login();
        assert_eq!(nav.current_route(), LOGIN_ROUTE);
    }
}
