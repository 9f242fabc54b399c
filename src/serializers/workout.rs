use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use super::{embed_user, load_users, nullable, UserRepr, WriteMode};
use crate::db::Store;
use crate::errors::AppError;
use crate::models::{Difficulty, Workout};
use crate::utils::validation::Checker;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkoutRepr {
    pub id: Uuid,
    pub user: UserRepr,
    pub title: String,
    pub description: String,
    pub duration_minutes: i32,
    pub difficulty: Difficulty,
    pub exercises: Vec<Value>,
    pub scheduled_date: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn expand_workouts(
    store: &dyn Store,
    workouts: Vec<Workout>,
) -> Result<Vec<WorkoutRepr>, AppError> {
    let users = load_users(store, workouts.iter().map(|w| w.user_id)).await?;
    workouts
        .into_iter()
        .map(|w| {
            Ok(WorkoutRepr {
                id: w.id,
                user: embed_user(&users, w.user_id)?,
                title: w.title,
                description: w.description,
                duration_minutes: w.duration_minutes,
                difficulty: w.difficulty,
                exercises: w.exercises.0,
                scheduled_date: w.scheduled_date,
                completed: w.completed,
                created_at: w.created_at,
                updated_at: w.updated_at,
            })
        })
        .collect()
}

pub async fn expand_workout(store: &dyn Store, workout: Workout) -> Result<WorkoutRepr, AppError> {
    expand_workouts(store, vec![workout])
        .await?
        .pop()
        .ok_or_else(|| AppError::InternalServerError("Workout expansion failed".to_string()))
}

#[derive(Deserialize, Validate, Default, Debug)]
pub struct WorkoutWrite {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: Option<String>,

    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_minutes: Option<i32>,

    /// Parsed in `check` so an unknown choice is reported against the field.
    pub difficulty: Option<String>,

    pub exercises: Option<Vec<Value>>,

    #[serde(default, deserialize_with = "nullable")]
    pub scheduled_date: Option<Option<NaiveDate>>,

    pub completed: Option<bool>,
}

impl WorkoutWrite {
    pub fn check(&self, mode: WriteMode) -> Result<(), AppError> {
        let mut checker = Checker::new(self);
        checker.choice::<Difficulty>("difficulty", self.difficulty.as_deref());
        if let Some(exercises) = &self.exercises {
            if exercises.iter().any(|e| !(e.is_string() || e.is_object())) {
                checker.add("exercises", "Each exercise must be a name or a descriptor object.");
            }
        }
        if mode.requires_all() {
            checker.require("title", &self.title);
            checker.require("description", &self.description);
            checker.require("duration_minutes", &self.duration_minutes);
            checker.require("difficulty", &self.difficulty);
        }
        checker.finish()
    }

    /// The owner is always the authenticated caller.
    pub fn into_workout(self, user_id: Uuid) -> Workout {
        let mut workout = Workout::new(
            user_id,
            self.title.as_deref().unwrap_or_default(),
            self.description.as_deref().unwrap_or_default(),
            self.duration_minutes.unwrap_or_default(),
            self.difficulty().unwrap_or(Difficulty::Easy),
        );
        self.apply(&mut workout);
        workout
    }

    fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty.as_deref().and_then(|d| d.parse().ok())
    }

    pub fn apply(self, workout: &mut Workout) {
        let difficulty = self.difficulty();
        if let Some(title) = self.title {
            workout.title = title;
        }
        if let Some(description) = self.description {
            workout.description = description;
        }
        if let Some(duration_minutes) = self.duration_minutes {
            workout.duration_minutes = duration_minutes;
        }
        if let Some(difficulty) = difficulty {
            workout.difficulty = difficulty;
        }
        if let Some(exercises) = self.exercises {
            workout.exercises = Json(exercises);
        }
        if let Some(scheduled_date) = self.scheduled_date {
            workout.scheduled_date = scheduled_date;
        }
        if let Some(completed) = self.completed {
            workout.completed = completed;
        }
        workout.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exercises_keep_their_order() {
        let payload: WorkoutWrite = serde_json::from_value(json!({
            "title": "Leg day",
            "description": "Squats and lunges",
            "duration_minutes": 45,
            "difficulty": "hard",
            "exercises": ["squat", {"name": "lunge", "reps": 12}, "calf raise"],
        }))
        .unwrap();
        assert!(payload.check(WriteMode::Create).is_ok());
        let workout = payload.into_workout(Uuid::now_v7());
        assert_eq!(workout.exercises.0[0], json!("squat"));
        assert_eq!(workout.exercises.0[2], json!("calf raise"));
        assert!(!workout.completed);
    }

    #[test]
    fn numeric_exercises_are_rejected() {
        let payload: WorkoutWrite = serde_json::from_value(json!({"exercises": [1, 2]})).unwrap();
        assert!(payload.check(WriteMode::Partial).is_err());
    }

    #[test]
    fn full_update_needs_every_required_field() {
        let payload: WorkoutWrite = serde_json::from_value(json!({"title": "x"})).unwrap();
        match payload.check(WriteMode::Replace) {
            Err(AppError::Validation(fields)) => {
                assert!(fields.contains_key("description"));
                assert!(fields.contains_key("difficulty"));
                assert!(!fields.contains_key("title"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
