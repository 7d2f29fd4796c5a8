//! Data models for HabitFlow API payloads.
//!
//! This module contains the request and response shapes the client
//! exchanges with the backend:
//!
//! - Auth payloads: `LoginRequest`, `RegisterRequest`, `AuthResponse`, `RefreshResponse`
//! - `User`, `UserProfile`: account and profile data
//! - `Habit`, `HabitEntry`, `HabitStack`, `HabitInput`: habit tracking
//! - `Badge`, `UserBadge`, `Challenge`: gamification
//! - `ListResponse`: list endpoints that may or may not be paginated

pub mod auth;
pub mod gamification;
pub mod habit;
pub mod list;
pub mod user;

pub use auth::{AuthResponse, LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest};
pub use gamification::{Badge, Challenge, ChallengeInput, UserBadge};
pub use habit::{Habit, HabitEntry, HabitEntryUpdate, HabitInput, HabitStack, HabitStackInput};
pub use list::ListResponse;
pub use user::{User, UserProfile, UserProfileUpdate};
