use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use std::str::FromStr;
use uuid::Uuid;

use super::InvalidChoice;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(InvalidChoice { kind: "difficulty", value: s.to_string() }),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = InvalidChoice;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Workout {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub duration_minutes: i32,
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
    /// Ordered exercise names or descriptor objects.
    pub exercises: Json<Vec<Value>>,
    pub scheduled_date: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workout {
    pub fn new(
        user_id: Uuid,
        title: &str,
        description: &str,
        duration_minutes: i32,
        difficulty: Difficulty,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            title: title.to_string(),
            description: description.to_string(),
            duration_minutes,
            difficulty,
            exercises: Json(Vec::new()),
            scheduled_date: None,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }
}
