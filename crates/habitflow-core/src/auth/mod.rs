//! Authentication module for managing credentials and the user session.
//!
//! This module provides:
//! - `CredentialStore`: persisted access/refresh token storage (memory, file, OS keyring)
//! - `Navigator`: the boundary used to send the user to the login screen
//! - `AuthSession`: login, registration, logout and restore-on-startup

pub mod credentials;
pub mod navigator;
pub mod session;

pub use credentials::{
    CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore, TokenKey,
};
pub use navigator::{Navigator, RouteTracker, LOGIN_ROUTE};
pub use session::{AuthFailure, AuthSession};
