use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A daily completion record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitEntry {
    pub id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub points_earned: i64,
}

/// A habit with its server-computed streak fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    #[serde(default)]
    pub public_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub color_code: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub current_streak: i64,
    #[serde(default)]
    pub best_streak: i64,
    #[serde(default)]
    pub last_completed: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_micro_habit: bool,
    #[serde(default)]
    pub reminder_enabled: bool,
    #[serde(default)]
    pub reminder_time: Option<String>,
    #[serde(default)]
    pub completion_rate: Option<f64>,
    #[serde(default)]
    pub total_completions: i64,
    #[serde(default)]
    pub entries: Vec<HabitEntry>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Habit {
    /// Whether the habit was completed on the given day
    pub fn completed_on(&self, day: NaiveDate) -> bool {
        self.last_completed == Some(day)
            || self.entries.iter().any(|e| e.date == day && e.completed)
    }
}

/// Writable habit fields for create (`POST habits/`) and update
/// (`PATCH habits/{id}/`). Unset fields are left out of the body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HabitInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_micro_habit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
}

impl HabitInput {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HabitEntryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Links a new habit to an existing anchor habit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitStack {
    pub id: i64,
    pub habit: i64,
    #[serde(default)]
    pub habit_title: Option<String>,
    pub anchor_habit: i64,
    #[serde(default)]
    pub anchor_habit_title: Option<String>,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitStackInput {
    pub habit: i64,
    pub anchor_habit: i64,
    pub position: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_habit_with_entries() {
        let json = r##"{
            "id": 3, "public_id": "abc", "title": "Read 10 pages", "description": "",
            "category": "learning", "frequency": "daily", "color_code": "#22c55e",
            "icon": "book", "current_streak": 4, "best_streak": 9,
            "last_completed": "2024-05-02", "is_active": true, "is_micro_habit": false,
            "reminder_enabled": false, "reminder_time": null, "completion_rate": 71.4,
            "total_completions": 20,
            "entries": [{"id": 1, "date": "2024-05-01", "completed": true, "note": "", "completed_at": null, "points_earned": 10}],
            "created_at": "2024-04-01T08:00:00Z", "updated_at": "2024-05-02T08:00:00Z"
        }"##;
        let habit: Habit = serde_json::from_str(json).unwrap();
        assert_eq!(habit.current_streak, 4);
        assert_eq!(habit.entries.len(), 1);

        let may1 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let may2 = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let may3 = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        assert!(habit.completed_on(may1));
        assert!(habit.completed_on(may2));
        assert!(!habit.completed_on(may3));
    }

    #[test]
    fn test_minimal_habit_defaults() {
        let habit: Habit = serde_json::from_str(r#"{"id": 1, "title": "Walk"}"#).unwrap();
        assert!(habit.is_active);
        assert!(habit.entries.is_empty());
    }

    #[test]
    fn test_habit_input_skips_unset_fields() {
        let json = serde_json::to_value(HabitInput::titled("Meditate")).unwrap();
        assert_eq!(json, serde_json::json!({"title": "Meditate"}));
    }
}
