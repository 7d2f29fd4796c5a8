//! REST API client module for the HabitFlow backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! HabitFlow API: auth, users, habits, community, challenges, analytics
//! and the forest game.
//!
//! The API uses JWT bearer tokens. Expired access tokens are refreshed
//! transparently through `auth/refresh/`, at most once per request and at
//! most once across concurrently failing requests.

pub mod client;
pub mod endpoints;
pub mod error;

pub use client::{normalize_base_url, ApiClient, ApiClientBuilder, RequestOptions, SessionState};
pub use endpoints::{LeaderboardKind, WaterType};
pub use error::{ApiError, ErrorBody};
