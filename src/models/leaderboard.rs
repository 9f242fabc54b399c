use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Per-user rollup of activity totals. Written only by the store's recomputation
/// and by seeding, never through the API.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
    pub total_calories: f64,
    pub total_distance: f64,
    pub total_activities: i32,
    pub rank: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaderboardEntry {
    pub fn new(user_id: Uuid, team_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            team_id,
            total_calories: 0.0,
            total_distance: 0.0,
            total_activities: 0,
            rank: None,
            created_at: now,
            updated_at: now,
        }
    }
}
