//! Core library for the HabitFlow client.
//!
//! - `api`: the authenticated REST client with transparent token refresh
//! - `auth`: credential storage, login redirection and the auth session
//! - `config`: base URL, timeout and credential backend settings
//! - `models`: typed request/response payloads

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, ErrorBody, RequestOptions, SessionState};
pub use auth::{AuthFailure, AuthSession, CredentialStore, Navigator};
pub use config::Config;
