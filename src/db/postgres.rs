use async_trait::async_trait;
use chrono::Utc;
use log::info;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{competition_ranks, Store, StoreError, StoreResult, Visibility};
use crate::models::{Activity, ActivityType, LeaderboardEntry, Membership, Team, User, Workout};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // 23505 = unique_violation
            if db_err.code().as_deref() == Some("23505") {
                match db_err.constraint() {
                    Some("users_email_key") => {
                        return StoreError::UniqueViolation { entity: "user", field: "email" }
                    }
                    Some("users_username_key") => {
                        return StoreError::UniqueViolation { entity: "user", field: "username" }
                    }
                    Some("teams_name_key") => {
                        return StoreError::UniqueViolation { entity: "team", field: "name" }
                    }
                    _ => {}
                }
            }
        }
        StoreError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Database(format!("migration failed: {}", err))
    }
}

#[derive(sqlx::FromRow)]
struct UserTotals {
    user_id: Uuid,
    total_calories: f64,
    total_distance: f64,
    total_activities: i32,
    first_team: Option<Uuid>,
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and brings the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, username, email, first_name, last_name, bio, profile_picture, password_hash, is_staff, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(&user.profile_picture)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET username = $2, email = $3, first_name = $4, last_name = $5, bio = $6, \
             profile_picture = $7, password_hash = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(&user.profile_picture)
        .bind(&user.password_hash)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_teams(&self) -> StoreResult<Vec<Team>> {
        let teams = sqlx::query_as::<_, Team>("SELECT * FROM teams ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(teams)
    }

    async fn get_team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(team)
    }

    async fn teams_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Team>> {
        let teams = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(teams)
    }

    async fn insert_team(&self, team: &Team) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO teams (id, name, description, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(team.id)
        .bind(&team.name)
        .bind(&team.description)
        .bind(team.created_by)
        .bind(team.created_at)
        .bind(team.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_team(&self, team: &Team) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE teams SET name = $2, description = $3, updated_at = $4 WHERE id = $1")
                .bind(team.id)
                .bind(&team.name)
                .bind(&team.description)
                .bind(team.updated_at)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_team(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn memberships(&self, team_ids: &[Uuid]) -> StoreResult<Vec<Membership>> {
        let members = sqlx::query_as::<_, Membership>(
            "SELECT * FROM team_members WHERE team_id = ANY($1) ORDER BY created_at, id",
        )
        .bind(team_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    async fn add_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO team_members (id, team_id, user_id, created_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (team_id, user_id) DO NOTHING",
        )
        .bind(Uuid::now_v7())
        .bind(team_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_activities(
        &self,
        visibility: Visibility,
        activity_type: Option<ActivityType>,
    ) -> StoreResult<Vec<Activity>> {
        let activities = sqlx::query_as::<_, Activity>(
            "SELECT * FROM activities \
             WHERE ($1::uuid IS NULL OR user_id = $1) AND ($2::text IS NULL OR activity_type = $2) \
             ORDER BY date DESC, created_at DESC",
        )
        .bind(visibility.owner())
        .bind(activity_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(activities)
    }

    async fn get_activity(&self, id: Uuid, visibility: Visibility) -> StoreResult<Option<Activity>> {
        let activity = sqlx::query_as::<_, Activity>(
            "SELECT * FROM activities WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)",
        )
        .bind(id)
        .bind(visibility.owner())
        .fetch_optional(&self.pool)
        .await?;
        Ok(activity)
    }

    async fn insert_activity(&self, activity: &Activity) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO activities (id, user_id, activity_type, duration_minutes, calories_burned, distance_km, description, date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(activity.id)
        .bind(activity.user_id)
        .bind(activity.activity_type.as_str())
        .bind(activity.duration_minutes)
        .bind(activity.calories_burned)
        .bind(activity.distance_km)
        .bind(&activity.description)
        .bind(activity.date)
        .bind(activity.created_at)
        .bind(activity.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_activity(&self, activity: &Activity) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE activities SET activity_type = $2, duration_minutes = $3, calories_burned = $4, \
             distance_km = $5, description = $6, date = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(activity.id)
        .bind(activity.activity_type.as_str())
        .bind(activity.duration_minutes)
        .bind(activity.calories_burned)
        .bind(activity.distance_km)
        .bind(&activity.description)
        .bind(activity.date)
        .bind(activity.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_activity(&self, id: Uuid, visibility: Visibility) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM activities WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)",
        )
        .bind(id)
        .bind(visibility.owner())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_workouts(&self, visibility: Visibility) -> StoreResult<Vec<Workout>> {
        let workouts = sqlx::query_as::<_, Workout>(
            "SELECT * FROM workouts WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC",
        )
        .bind(visibility.owner())
        .fetch_all(&self.pool)
        .await?;
        Ok(workouts)
    }

    async fn get_workout(&self, id: Uuid, visibility: Visibility) -> StoreResult<Option<Workout>> {
        let workout = sqlx::query_as::<_, Workout>(
            "SELECT * FROM workouts WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)",
        )
        .bind(id)
        .bind(visibility.owner())
        .fetch_optional(&self.pool)
        .await?;
        Ok(workout)
    }

    async fn insert_workout(&self, workout: &Workout) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO workouts (id, user_id, title, description, duration_minutes, difficulty, exercises, scheduled_date, completed, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(workout.id)
        .bind(workout.user_id)
        .bind(&workout.title)
        .bind(&workout.description)
        .bind(workout.duration_minutes)
        .bind(workout.difficulty.as_str())
        .bind(&workout.exercises)
        .bind(workout.scheduled_date)
        .bind(workout.completed)
        .bind(workout.created_at)
        .bind(workout.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_workout(&self, workout: &Workout) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE workouts SET title = $2, description = $3, duration_minutes = $4, difficulty = $5, \
             exercises = $6, scheduled_date = $7, completed = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(workout.id)
        .bind(&workout.title)
        .bind(&workout.description)
        .bind(workout.duration_minutes)
        .bind(workout.difficulty.as_str())
        .bind(&workout.exercises)
        .bind(workout.scheduled_date)
        .bind(workout.completed)
        .bind(workout.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete_workout(&self, id: Uuid, visibility: Visibility) -> StoreResult<Option<Workout>> {
        let workout = sqlx::query_as::<_, Workout>(
            "UPDATE workouts SET completed = TRUE, updated_at = $3 \
             WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2) RETURNING *",
        )
        .bind(id)
        .bind(visibility.owner())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(workout)
    }

    async fn delete_workout(&self, id: Uuid, visibility: Visibility) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM workouts WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)",
        )
        .bind(id)
        .bind(visibility.owner())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_leaderboard(&self, team_id: Option<Uuid>) -> StoreResult<Vec<LeaderboardEntry>> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            "SELECT * FROM leaderboard WHERE ($1::uuid IS NULL OR team_id = $1) \
             ORDER BY total_calories DESC, created_at",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn get_leaderboard_entry(&self, id: Uuid) -> StoreResult<Option<LeaderboardEntry>> {
        let entry = sqlx::query_as::<_, LeaderboardEntry>("SELECT * FROM leaderboard WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn insert_leaderboard_entry(&self, entry: &LeaderboardEntry) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO leaderboard (id, user_id, team_id, total_calories, total_distance, total_activities, rank, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.team_id)
        .bind(entry.total_calories)
        .bind(entry.total_distance)
        .bind(entry.total_activities)
        .bind(entry.rank)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recompute_leaderboard(&self) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;

        let mut totals = sqlx::query_as::<_, UserTotals>(
            "SELECT u.id AS user_id, \
                    COALESCE(SUM(a.calories_burned), 0)::float8 AS total_calories, \
                    COALESCE(SUM(a.distance_km), 0)::float8 AS total_distance, \
                    COUNT(a.id)::int4 AS total_activities, \
                    (SELECT m.team_id FROM team_members m WHERE m.user_id = u.id \
                     ORDER BY m.created_at LIMIT 1) AS first_team \
             FROM users u LEFT JOIN activities a ON a.user_id = u.id \
             GROUP BY u.id",
        )
        .fetch_all(&mut *tx)
        .await?;

        totals.sort_by(|a, b| b.total_calories.total_cmp(&a.total_calories));
        let calories: Vec<f64> = totals.iter().map(|t| t.total_calories).collect();
        let ranks = competition_ranks(&calories);

        let now = Utc::now();
        for (row, rank) in totals.iter().zip(ranks) {
            sqlx::query(
                "INSERT INTO leaderboard (id, user_id, team_id, total_calories, total_distance, total_activities, rank, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
                 ON CONFLICT (user_id) DO UPDATE SET \
                    team_id = COALESCE(leaderboard.team_id, EXCLUDED.team_id), \
                    total_calories = EXCLUDED.total_calories, \
                    total_distance = EXCLUDED.total_distance, \
                    total_activities = EXCLUDED.total_activities, \
                    rank = EXCLUDED.rank, \
                    updated_at = EXCLUDED.updated_at",
            )
            .bind(Uuid::now_v7())
            .bind(row.user_id)
            .bind(row.first_team)
            .bind(row.total_calories)
            .bind(row.total_distance)
            .bind(row.total_activities)
            .bind(rank)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(totals.len() as u64)
    }

    async fn clear(&self) -> StoreResult<()> {
        sqlx::query("TRUNCATE TABLE leaderboard, team_members, activities, workouts, teams, users")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
