use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{embed_user, load_users, nullable, UserRepr, WriteMode};
use crate::db::Store;
use crate::errors::AppError;
use crate::models::{Activity, ActivityType};
use crate::utils::validation::Checker;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActivityRepr {
    pub id: Uuid,
    pub user: UserRepr,
    pub activity_type: ActivityType,
    pub duration_minutes: i32,
    pub calories_burned: f64,
    pub distance_km: Option<f64>,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn expand_activities(
    store: &dyn Store,
    activities: Vec<Activity>,
) -> Result<Vec<ActivityRepr>, AppError> {
    let users = load_users(store, activities.iter().map(|a| a.user_id)).await?;
    activities
        .into_iter()
        .map(|a| {
            Ok(ActivityRepr {
                id: a.id,
                user: embed_user(&users, a.user_id)?,
                activity_type: a.activity_type,
                duration_minutes: a.duration_minutes,
                calories_burned: a.calories_burned,
                distance_km: a.distance_km,
                description: a.description,
                date: a.date,
                created_at: a.created_at,
                updated_at: a.updated_at,
            })
        })
        .collect()
}

pub async fn expand_activity(store: &dyn Store, activity: Activity) -> Result<ActivityRepr, AppError> {
    expand_activities(store, vec![activity])
        .await?
        .pop()
        .ok_or_else(|| AppError::InternalServerError("Activity expansion failed".to_string()))
}

#[derive(Deserialize, Validate, Default, Debug)]
pub struct ActivityWrite {
    /// Parsed in `check` so an unknown choice is reported against the field.
    pub activity_type: Option<String>,

    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_minutes: Option<i32>,

    #[validate(range(min = 0.0, message = "Calories burned cannot be negative"))]
    pub calories_burned: Option<f64>,

    #[serde(default, deserialize_with = "nullable")]
    pub distance_km: Option<Option<f64>>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    pub date: Option<NaiveDate>,
}

impl ActivityWrite {
    pub fn check(&self, mode: WriteMode) -> Result<(), AppError> {
        let mut checker = Checker::new(self);
        checker.choice::<ActivityType>("activity_type", self.activity_type.as_deref());
        checker.non_negative("distance_km", self.distance_km.flatten());
        if mode.requires_all() {
            checker.require("activity_type", &self.activity_type);
            checker.require("duration_minutes", &self.duration_minutes);
            checker.require("calories_burned", &self.calories_burned);
            checker.require("date", &self.date);
        }
        checker.finish()
    }

    /// The owner is always the authenticated caller.
    pub fn into_activity(self, user_id: Uuid) -> Activity {
        let mut activity = Activity::new(
            user_id,
            self.activity_type().unwrap_or(ActivityType::Other),
            self.duration_minutes.unwrap_or_default(),
            self.calories_burned.unwrap_or_default(),
            self.date.unwrap_or_else(|| Utc::now().date_naive()),
        );
        self.apply(&mut activity);
        activity
    }

    fn activity_type(&self) -> Option<ActivityType> {
        self.activity_type.as_deref().and_then(|t| t.parse().ok())
    }

    pub fn apply(self, activity: &mut Activity) {
        if let Some(activity_type) = self.activity_type() {
            activity.activity_type = activity_type;
        }
        if let Some(duration_minutes) = self.duration_minutes {
            activity.duration_minutes = duration_minutes;
        }
        if let Some(calories_burned) = self.calories_burned {
            activity.calories_burned = calories_burned;
        }
        if let Some(distance_km) = self.distance_km {
            activity.distance_km = distance_km;
        }
        if let Some(description) = self.description {
            activity.description = description;
        }
        if let Some(date) = self.date {
            activity.date = date;
        }
        activity.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_core_fields() {
        let payload: ActivityWrite = serde_json::from_str(r#"{"activity_type": "running"}"#).unwrap();
        match payload.check(WriteMode::Create) {
            Err(AppError::Validation(fields)) => {
                let names: Vec<&str> = fields.keys().map(String::as_str).collect();
                assert_eq!(names, vec!["calories_burned", "date", "duration_minutes"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn negative_numbers_are_rejected() {
        let payload: ActivityWrite =
            serde_json::from_str(r#"{"duration_minutes": -5, "distance_km": -1.5}"#).unwrap();
        match payload.check(WriteMode::Partial) {
            Err(AppError::Validation(fields)) => {
                assert!(fields.contains_key("duration_minutes"));
                assert!(fields.contains_key("distance_km"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_type_is_a_field_error() {
        let payload: ActivityWrite = serde_json::from_str(r#"{"activity_type": "jogging"}"#).unwrap();
        match payload.check(WriteMode::Partial) {
            Err(AppError::Validation(fields)) => {
                assert_eq!(fields["activity_type"], vec!["\"jogging\" is not a valid choice.".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn owner_comes_from_the_caller() {
        let caller = Uuid::now_v7();
        let payload: ActivityWrite = serde_json::from_str(&format!(
            r#"{{"user": "{}", "user_id": "{}", "activity_type": "running", "duration_minutes": 30, "calories_burned": 300, "date": "2025-01-01"}}"#,
            Uuid::now_v7(),
            Uuid::now_v7()
        ))
        .unwrap();
        assert!(payload.check(WriteMode::Create).is_ok());
        let activity = payload.into_activity(caller);
        assert_eq!(activity.user_id, caller);
        assert_eq!(activity.calories_burned, 300.0);
    }
}
