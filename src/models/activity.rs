use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::InvalidChoice;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Running,
    Cycling,
    Swimming,
    Strength,
    Yoga,
    Walking,
    Other,
}

impl ActivityType {
    pub const ALL: [ActivityType; 7] = [
        ActivityType::Running,
        ActivityType::Cycling,
        ActivityType::Swimming,
        ActivityType::Strength,
        ActivityType::Yoga,
        ActivityType::Walking,
        ActivityType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Running => "running",
            ActivityType::Cycling => "cycling",
            ActivityType::Swimming => "swimming",
            ActivityType::Strength => "strength",
            ActivityType::Yoga => "yoga",
            ActivityType::Walking => "walking",
            ActivityType::Other => "other",
        }
    }
}

impl FromStr for ActivityType {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| InvalidChoice { kind: "activity type", value: s.to_string() })
    }
}

impl TryFrom<String> for ActivityType {
    type Error = InvalidChoice;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub activity_type: ActivityType,
    pub duration_minutes: i32,
    pub calories_burned: f64,
    pub distance_km: Option<f64>,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(
        user_id: Uuid,
        activity_type: ActivityType,
        duration_minutes: i32,
        calories_burned: f64,
        date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            activity_type,
            duration_minutes,
            calories_burned,
            distance_km: None,
            description: None,
            date,
            created_at: now,
            updated_at: now,
        }
    }
}
