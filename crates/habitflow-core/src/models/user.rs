use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public account fields as returned by `users/me/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub public_id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Full name when set, otherwise the username
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        match (first.is_empty(), last.is_empty()) {
            (true, true) => self.username.clone(),
            (false, true) => first.to_string(),
            (true, false) => last.to_string(),
            (false, false) => format!("{} {}", first, last),
        }
    }
}

/// Extended profile with stats, as returned by `users/profile/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub identity_progress: i64,
    #[serde(default)]
    pub total_habits_created: i64,
    #[serde(default)]
    pub total_completions: i64,
    #[serde(default)]
    pub current_streak: i64,
    #[serde(default)]
    pub best_streak: i64,
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub level: i64,
    #[serde(default)]
    pub profile_public: bool,
    #[serde(default)]
    pub show_statistics: bool,
}

/// Writable profile fields for `PATCH users/profile/`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_statistics: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_me_response() {
        let json = r#"{"id": 7, "public_id": "0e65066c-ab20-4da0-b3bf-79dfd0668049", "username": "sam", "email": "sam@example.com", "first_name": "", "last_name": "", "bio": "", "avatar": null, "email_verified": false, "created_at": "2024-03-01T12:00:00Z"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.display_name(), "sam");
        assert!(user.avatar.is_none());
        assert!(user.created_at.is_some());
    }

    #[test]
    fn test_display_name() {
        let user = User {
            username: "sam".into(),
            first_name: Some("Sam".into()),
            last_name: Some("Rivera".into()),
            ..Default::default()
        };
        assert_eq!(user.display_name(), "Sam Rivera");
    }

    #[test]
    fn test_profile_defaults_missing_stats() {
        let profile: UserProfile = serde_json::from_str(r#"{"bio": "runner", "level": 3}"#).unwrap();
        assert_eq!(profile.level, 3);
        assert_eq!(profile.total_points, 0);
        assert!(profile.user.is_none());
    }
}
