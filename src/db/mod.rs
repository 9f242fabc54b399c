//! Data access for every entity.
//!
//! Handlers only see the [`Store`] trait. [`PgStore`] is the production
//! implementation; [`MemoryStore`] keeps the same uniqueness, cascade and
//! ordering rules in process and backs the test suite.
//!
//! Every method is one atomic unit: a single statement or an explicit
//! transaction.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use actix_web::web;
use async_trait::async_trait;
use log::info;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{Config, StorageBackend};
use crate::models::{Activity, ActivityType, LeaderboardEntry, Membership, Team, User, Workout};

#[derive(Debug)]
pub enum StoreError {
    /// A unique constraint rejected the write. `field` is the JSON field name.
    UniqueViolation { entity: &'static str, field: &'static str },
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UniqueViolation { entity, field } => {
                write!(f, "duplicate {} for {}", field, entity)
            }
            StoreError::Database(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which owners' rows a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    All,
    OwnedBy(Uuid),
}

impl Visibility {
    /// Staff see everything, everyone else only their own rows.
    pub fn for_user(user: &User) -> Self {
        if user.is_staff {
            Visibility::All
        } else {
            Visibility::OwnedBy(user.id)
        }
    }

    pub fn allows(&self, owner: Uuid) -> bool {
        match self {
            Visibility::All => true,
            Visibility::OwnedBy(id) => *id == owner,
        }
    }

    pub fn owner(&self) -> Option<Uuid> {
        match self {
            Visibility::All => None,
            Visibility::OwnedBy(id) => Some(*id),
        }
    }
}

/// Shared handle registered as actix app data.
pub type SharedStore = web::Data<dyn Store>;

/// Opens the configured backend.
pub async fn connect(config: &Config) -> StoreResult<SharedStore> {
    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| StoreError::Database("DATABASE_URL must be set".to_string()))?;
            Arc::new(PgStore::connect(url, config.max_db_connections).await?)
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(web::Data::from(store))
}

#[async_trait]
pub trait Store: Send + Sync {
    // Users, oldest first.
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    /// Updates return false when the row no longer exists.
    async fn update_user(&self, user: &User) -> StoreResult<bool>;
    /// Cascades to owned activities, workouts, leaderboard entry, memberships
    /// and the teams the user created.
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    // Teams, oldest first.
    async fn list_teams(&self) -> StoreResult<Vec<Team>>;
    async fn get_team(&self, id: Uuid) -> StoreResult<Option<Team>>;
    async fn teams_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Team>>;
    async fn insert_team(&self, team: &Team) -> StoreResult<()>;
    async fn update_team(&self, team: &Team) -> StoreResult<bool>;
    /// Cascades to memberships and leaderboard entries pointing at the team.
    async fn delete_team(&self, id: Uuid) -> StoreResult<bool>;
    /// Memberships of the given teams in join order.
    async fn memberships(&self, team_ids: &[Uuid]) -> StoreResult<Vec<Membership>>;
    /// Returns false when the user already was a member.
    async fn add_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    /// Returns false when the user was not a member.
    async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    // Activities, newest date first.
    async fn list_activities(
        &self,
        visibility: Visibility,
        activity_type: Option<ActivityType>,
    ) -> StoreResult<Vec<Activity>>;
    async fn get_activity(&self, id: Uuid, visibility: Visibility) -> StoreResult<Option<Activity>>;
    async fn insert_activity(&self, activity: &Activity) -> StoreResult<()>;
    async fn update_activity(&self, activity: &Activity) -> StoreResult<bool>;
    async fn delete_activity(&self, id: Uuid, visibility: Visibility) -> StoreResult<bool>;

    // Workouts, newest first.
    async fn list_workouts(&self, visibility: Visibility) -> StoreResult<Vec<Workout>>;
    async fn get_workout(&self, id: Uuid, visibility: Visibility) -> StoreResult<Option<Workout>>;
    async fn insert_workout(&self, workout: &Workout) -> StoreResult<()>;
    async fn update_workout(&self, workout: &Workout) -> StoreResult<bool>;
    /// Sets only the completed flag, leaving concurrent edits to other columns intact.
    async fn complete_workout(&self, id: Uuid, visibility: Visibility) -> StoreResult<Option<Workout>>;
    async fn delete_workout(&self, id: Uuid, visibility: Visibility) -> StoreResult<bool>;

    // Leaderboard, highest total calories first.
    async fn list_leaderboard(&self, team_id: Option<Uuid>) -> StoreResult<Vec<LeaderboardEntry>>;
    async fn get_leaderboard_entry(&self, id: Uuid) -> StoreResult<Option<LeaderboardEntry>>;
    async fn insert_leaderboard_entry(&self, entry: &LeaderboardEntry) -> StoreResult<()>;
    /// Rebuilds every user's totals and ranks from their activities. Returns the
    /// number of entries written.
    async fn recompute_leaderboard(&self) -> StoreResult<u64>;

    /// Deletes every row. Used by seeding.
    async fn clear(&self) -> StoreResult<()>;
}

/// Standard competition ranking ("1224") over descending calories.
pub(crate) fn competition_ranks(calories_desc: &[f64]) -> Vec<i32> {
    let mut ranks = Vec::with_capacity(calories_desc.len());
    for (i, calories) in calories_desc.iter().enumerate() {
        let rank = match (i, ranks.last()) {
            (0, _) | (_, None) => 1,
            (_, Some(&prev)) if calories_desc[i - 1] == *calories => prev,
            _ => i as i32 + 1,
        };
        ranks.push(rank);
    }
    ranks
}
