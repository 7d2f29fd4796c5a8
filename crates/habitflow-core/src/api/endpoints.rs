//! Per-resource passthroughs on top of the generic verbs.
//!
//! None of these carry special semantics; they fix the path and the body
//! shape for each backend endpoint. Responses whose shape the server owns
//! entirely (analytics, forest state, feed items) are returned as
//! `serde_json::Value`.

use serde_json::{json, Value};

use crate::models::{
    Challenge, ChallengeInput, Habit, HabitEntry, HabitEntryUpdate, HabitInput, HabitStack,
    HabitStackInput, ListResponse, User, UserBadge, UserProfile, UserProfileUpdate,
};

use super::{ApiClient, ApiError, RequestOptions};

/// Time window for the community leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeaderboardKind {
    #[default]
    Weekly,
    Monthly,
    AllTime,
}

impl LeaderboardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardKind::Weekly => "weekly",
            LeaderboardKind::Monthly => "monthly",
            LeaderboardKind::AllTime => "all_time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaterType {
    Mist,
    #[default]
    Normal,
    Heavy,
}

impl WaterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaterType::Mist => "mist",
            WaterType::Normal => "normal",
            WaterType::Heavy => "heavy",
        }
    }
}

impl ApiClient {
    // ===== Users =====

    pub async fn me(&self) -> Result<User, ApiError> {
        self.get("users/me/").await
    }

    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.get("users/profile/").await
    }

    pub async fn update_profile(&self, update: &UserProfileUpdate) -> Result<UserProfile, ApiError> {
        self.patch("users/profile/", update).await
    }

    pub async fn user_badges(&self) -> Result<ListResponse<UserBadge>, ApiError> {
        self.get("users/badges/").await
    }

    pub async fn user_level(&self) -> Result<Value, ApiError> {
        self.get("users/level/").await
    }

    pub async fn points(&self) -> Result<Value, ApiError> {
        self.get("users/points/").await
    }

    pub async fn search_users(&self, query: &str) -> Result<ListResponse<User>, ApiError> {
        self.get_with("users/search/", RequestOptions::new().query("q", query))
            .await
    }

    pub async fn public_users(&self, options: RequestOptions) -> Result<ListResponse<User>, ApiError> {
        self.get_with("users/public/", options).await
    }

    pub async fn follow_user(&self, user_id: i64) -> Result<Value, ApiError> {
        self.post("users/follow/", &json!({ "user_id": user_id })).await
    }

    pub async fn unfollow_user(&self, user_id: i64) -> Result<Value, ApiError> {
        self.delete_with_body("users/follow/", &json!({ "user_id": user_id }))
            .await
    }

    // ===== Habits =====

    pub async fn habits(&self, options: RequestOptions) -> Result<ListResponse<Habit>, ApiError> {
        self.get_with("habits/", options).await
    }

    pub async fn today_habits(&self) -> Result<ListResponse<Habit>, ApiError> {
        self.get("habits/today/").await
    }

    pub async fn create_habit(&self, input: &HabitInput) -> Result<Habit, ApiError> {
        self.post("habits/", input).await
    }

    pub async fn update_habit(&self, habit_id: i64, input: &HabitInput) -> Result<Habit, ApiError> {
        self.patch(&format!("habits/{}/", habit_id), input).await
    }

    pub async fn delete_habit(&self, habit_id: i64) -> Result<(), ApiError> {
        self.delete::<Value>(&format!("habits/{}/", habit_id))
            .await
            .map(|_| ())
    }

    pub async fn habit_entries(
        &self,
        habit_id: i64,
        options: RequestOptions,
    ) -> Result<ListResponse<HabitEntry>, ApiError> {
        self.get_with(&format!("habits/{}/entries/", habit_id), options)
            .await
    }

    /// Quick completion for today, optionally with a note
    pub async fn mark_complete(&self, habit_id: i64, note: Option<&str>) -> Result<Value, ApiError> {
        self.post(
            &format!("habits/{}/mark_complete/", habit_id),
            &json!({ "note": note.unwrap_or("") }),
        )
        .await
    }

    pub async fn update_habit_entry(
        &self,
        habit_id: i64,
        entry_id: i64,
        update: &HabitEntryUpdate,
    ) -> Result<HabitEntry, ApiError> {
        self.patch(&format!("habits/{}/entries/{}/", habit_id, entry_id), update)
            .await
    }

    pub async fn habit_stacks(&self) -> Result<ListResponse<HabitStack>, ApiError> {
        self.get("habits/stacks/").await
    }

    pub async fn create_habit_stack(&self, input: &HabitStackInput) -> Result<HabitStack, ApiError> {
        self.post("habits/stacks/", input).await
    }

    pub async fn statistics(&self) -> Result<Value, ApiError> {
        self.get("habits/statistics/").await
    }

    // ===== Community =====

    pub async fn social_feed(&self) -> Result<ListResponse<Value>, ApiError> {
        self.get("habits/feed/").await
    }

    pub async fn community_stats(&self) -> Result<Value, ApiError> {
        self.get("users/community/stats/").await
    }

    pub async fn leaderboard(&self, kind: LeaderboardKind) -> Result<Value, ApiError> {
        self.get_with(
            "users/community/leaderboard/",
            RequestOptions::new().query("type", kind.as_str()),
        )
        .await
    }

    // ===== Challenges =====

    pub async fn challenges(&self) -> Result<ListResponse<Challenge>, ApiError> {
        self.get("habits/challenges/").await
    }

    pub async fn create_challenge(&self, input: &ChallengeInput) -> Result<Challenge, ApiError> {
        self.post("habits/challenges/", input).await
    }

    pub async fn join_challenge(&self, challenge_id: i64) -> Result<Value, ApiError> {
        self.post(&format!("habits/challenges/{}/join/", challenge_id), &json!({}))
            .await
    }

    // ===== Analytics =====

    pub async fn weekly_analytics(&self) -> Result<Value, ApiError> {
        self.get("habits/analytics/weekly/").await
    }

    pub async fn monthly_analytics(&self) -> Result<Value, ApiError> {
        self.get("habits/analytics/monthly/").await
    }

    // ===== Forest =====

    pub async fn forest_overview(&self) -> Result<Value, ApiError> {
        self.get("forest/overview/").await
    }

    pub async fn water_tree(&self, habit_id: i64, water: WaterType) -> Result<Value, ApiError> {
        self.post(
            "forest/water/",
            &json!({ "habit_id": habit_id, "water_type": water.as_str() }),
        )
        .await
    }

    pub async fn prune_tree(&self, habit_id: i64) -> Result<Value, ApiError> {
        self.post("forest/prune/", &json!({ "habit_id": habit_id })).await
    }

    pub async fn fertilize_tree(&self, habit_id: i64) -> Result<Value, ApiError> {
        self.post("forest/fertilize/", &json!({ "habit_id": habit_id }))
            .await
    }

    pub async fn move_tree(&self, habit_id: i64, x: f64, y: f64) -> Result<Value, ApiError> {
        self.post("forest/move/", &json!({ "habit_id": habit_id, "x": x, "y": y }))
            .await
    }

    /// Duration defaults to 6 hours on the backend when `None`
    pub async fn change_weather(&self, weather: &str, duration_hours: Option<u32>) -> Result<Value, ApiError> {
        self.post(
            "forest/weather/",
            &json!({ "weather_type": weather, "duration_hours": duration_hours.unwrap_or(6) }),
        )
        .await
    }

    pub async fn forest_statistics(&self) -> Result<Value, ApiError> {
        self.get("forest/statistics/").await
    }
}
