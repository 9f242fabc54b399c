//! Wire representations and write allow-lists.
//!
//! Each entity has a `*Repr` (what responses expose, with related rows
//! embedded) and a `*Write` (the only fields a client may set). Fields that
//! are not part of a `*Write` struct are dropped by serde, which is how
//! identifiers, timestamps, owners and team membership stay read-only.

pub mod activity;
pub mod leaderboard;
pub mod team;
pub mod user;
pub mod workout;

pub use activity::{ActivityRepr, ActivityWrite};
pub use leaderboard::LeaderboardRepr;
pub use team::{MemberRequest, TeamRepr, TeamWrite};
pub use user::{UserRepr, UserWrite};
pub use workout::{WorkoutRepr, WorkoutWrite};

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::Store;
use crate::errors::AppError;
use crate::models::User;

/// How a write payload is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    /// PUT: required fields must be present.
    Replace,
    /// PATCH: any subset.
    Partial,
}

impl WriteMode {
    pub fn requires_all(self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Loads the users referenced by a page of rows in one query.
pub(crate) async fn load_users(
    store: &dyn Store,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, User>, AppError> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = store.users_by_ids(&ids).await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

pub(crate) fn embed_user(users: &HashMap<Uuid, User>, id: Uuid) -> Result<UserRepr, AppError> {
    users
        .get(&id)
        .map(UserRepr::from)
        .ok_or_else(|| AppError::InternalServerError(format!("Related user {} missing", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "nullable")]
        scheduled_date: Option<Option<NaiveDate>>,
    }

    #[test]
    fn nullable_separates_missing_from_null() {
        let missing: Probe = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.scheduled_date, None);

        let null: Probe = serde_json::from_str(r#"{"scheduled_date": null}"#).unwrap();
        assert_eq!(null.scheduled_date, Some(None));

        let set: Probe = serde_json::from_str(r#"{"scheduled_date": "2025-03-01"}"#).unwrap();
        assert_eq!(set.scheduled_date, Some(NaiveDate::from_ymd_opt(2025, 3, 1)));
    }

    #[test]
    fn only_partial_writes_skip_required_fields() {
        assert!(WriteMode::Create.requires_all());
        assert!(WriteMode::Replace.requires_all());
        assert!(!WriteMode::Partial.requires_all());
    }
}
