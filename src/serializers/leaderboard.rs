use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::team::expand_teams;
use super::{embed_user, load_users, TeamRepr, UserRepr};
use crate::db::Store;
use crate::errors::AppError;
use crate::models::LeaderboardEntry;

/// Entirely read-only; there is no write counterpart.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LeaderboardRepr {
    pub id: Uuid,
    pub user: UserRepr,
    pub team: Option<TeamRepr>,
    pub total_calories: f64,
    pub total_distance: f64,
    pub total_activities: i32,
    pub rank: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn expand_entries(
    store: &dyn Store,
    entries: Vec<LeaderboardEntry>,
) -> Result<Vec<LeaderboardRepr>, AppError> {
    let users = load_users(store, entries.iter().map(|e| e.user_id)).await?;

    let mut team_ids: Vec<Uuid> = entries.iter().filter_map(|e| e.team_id).collect();
    team_ids.sort();
    team_ids.dedup();
    let teams: HashMap<Uuid, TeamRepr> = if team_ids.is_empty() {
        HashMap::new()
    } else {
        let rows = store.teams_by_ids(&team_ids).await?;
        expand_teams(store, rows)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect()
    };

    entries
        .into_iter()
        .map(|e| {
            Ok(LeaderboardRepr {
                id: e.id,
                user: embed_user(&users, e.user_id)?,
                team: e.team_id.and_then(|id| teams.get(&id).cloned()),
                total_calories: e.total_calories,
                total_distance: e.total_distance,
                total_activities: e.total_activities,
                rank: e.rank,
                created_at: e.created_at,
                updated_at: e.updated_at,
            })
        })
        .collect()
}
