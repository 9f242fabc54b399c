use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{competition_ranks, Store, StoreError, StoreResult, Visibility};
use crate::models::{Activity, ActivityType, LeaderboardEntry, Membership, Team, User, Workout};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    teams: Vec<Team>,
    members: Vec<Membership>,
    activities: Vec<Activity>,
    leaderboard: Vec<LeaderboardEntry>,
    workouts: Vec<Workout>,
}

impl Tables {
    fn check_user_unique(&self, user: &User) -> StoreResult<()> {
        let others = self.users.iter().filter(|u| u.id != user.id);
        for other in others {
            if other.username == user.username {
                return Err(StoreError::UniqueViolation { entity: "user", field: "username" });
            }
            if other.email == user.email {
                return Err(StoreError::UniqueViolation { entity: "user", field: "email" });
            }
        }
        Ok(())
    }

    fn check_team_unique(&self, team: &Team) -> StoreResult<()> {
        if self.teams.iter().any(|t| t.id != team.id && t.name == team.name) {
            return Err(StoreError::UniqueViolation { entity: "team", field: "name" });
        }
        Ok(())
    }

    fn delete_team_rows(&mut self, team_id: Uuid) {
        self.teams.retain(|t| t.id != team_id);
        self.members.retain(|m| m.team_id != team_id);
        self.leaderboard.retain(|e| e.team_id != Some(team_id));
    }
}

/// In-process store with the same constraints as the Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn replace<T, F>(rows: &mut [T], row: T, same: F) -> bool
where
    F: Fn(&T) -> bool,
{
    match rows.iter_mut().find(|r| same(r)) {
        Some(slot) => {
            *slot = row;
            true
        }
        None => false,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.lock();
        let mut users = tables.users.clone();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.username == username).cloned())
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let tables = self.lock();
        Ok(tables.users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.lock();
        tables.check_user_unique(user)?;
        tables.users.push(user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        let mut tables = self.lock();
        tables.check_user_unique(user)?;
        Ok(replace(&mut tables.users, user.clone(), |u| u.id == user.id))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.lock();
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Ok(false);
        }
        let created: Vec<Uuid> =
            tables.teams.iter().filter(|t| t.created_by == id).map(|t| t.id).collect();
        for team_id in created {
            tables.delete_team_rows(team_id);
        }
        tables.members.retain(|m| m.user_id != id);
        tables.activities.retain(|a| a.user_id != id);
        tables.workouts.retain(|w| w.user_id != id);
        tables.leaderboard.retain(|e| e.user_id != id);
        Ok(true)
    }

    async fn list_teams(&self) -> StoreResult<Vec<Team>> {
        let mut teams = self.lock().teams.clone();
        teams.sort_by_key(|t| (t.created_at, t.id));
        Ok(teams)
    }

    async fn get_team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self.lock().teams.iter().find(|t| t.id == id).cloned())
    }

    async fn teams_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Team>> {
        let tables = self.lock();
        Ok(tables.teams.iter().filter(|t| ids.contains(&t.id)).cloned().collect())
    }

    async fn insert_team(&self, team: &Team) -> StoreResult<()> {
        let mut tables = self.lock();
        if !tables.users.iter().any(|u| u.id == team.created_by) {
            return Err(StoreError::Database("team creator does not exist".to_string()));
        }
        tables.check_team_unique(team)?;
        tables.teams.push(team.clone());
        Ok(())
    }

    async fn update_team(&self, team: &Team) -> StoreResult<bool> {
        let mut tables = self.lock();
        tables.check_team_unique(team)?;
        Ok(replace(&mut tables.teams, team.clone(), |t| t.id == team.id))
    }

    async fn delete_team(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.lock();
        if !tables.teams.iter().any(|t| t.id == id) {
            return Ok(false);
        }
        tables.delete_team_rows(id);
        Ok(true)
    }

    async fn memberships(&self, team_ids: &[Uuid]) -> StoreResult<Vec<Membership>> {
        let tables = self.lock();
        let mut members: Vec<Membership> = tables
            .members
            .iter()
            .filter(|m| team_ids.contains(&m.team_id))
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.created_at, m.id));
        Ok(members)
    }

    async fn add_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.lock();
        if !tables.teams.iter().any(|t| t.id == team_id) || !tables.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::Database("membership references a missing row".to_string()));
        }
        if tables.members.iter().any(|m| m.team_id == team_id && m.user_id == user_id) {
            return Ok(false);
        }
        tables.members.push(Membership {
            id: Uuid::now_v7(),
            team_id,
            user_id,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.lock();
        let before = tables.members.len();
        tables.members.retain(|m| !(m.team_id == team_id && m.user_id == user_id));
        Ok(tables.members.len() < before)
    }

    async fn list_activities(
        &self,
        visibility: Visibility,
        activity_type: Option<ActivityType>,
    ) -> StoreResult<Vec<Activity>> {
        let tables = self.lock();
        let mut activities: Vec<Activity> = tables
            .activities
            .iter()
            .filter(|a| visibility.allows(a.user_id))
            .filter(|a| activity_type.map_or(true, |t| a.activity_type == t))
            .cloned()
            .collect();
        activities.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(activities)
    }

    async fn get_activity(&self, id: Uuid, visibility: Visibility) -> StoreResult<Option<Activity>> {
        let tables = self.lock();
        Ok(tables
            .activities
            .iter()
            .find(|a| a.id == id && visibility.allows(a.user_id))
            .cloned())
    }

    async fn insert_activity(&self, activity: &Activity) -> StoreResult<()> {
        let mut tables = self.lock();
        if !tables.users.iter().any(|u| u.id == activity.user_id) {
            return Err(StoreError::Database("activity owner does not exist".to_string()));
        }
        tables.activities.push(activity.clone());
        Ok(())
    }

    async fn update_activity(&self, activity: &Activity) -> StoreResult<bool> {
        let mut tables = self.lock();
        Ok(replace(&mut tables.activities, activity.clone(), |a| a.id == activity.id))
    }

    async fn delete_activity(&self, id: Uuid, visibility: Visibility) -> StoreResult<bool> {
        let mut tables = self.lock();
        let before = tables.activities.len();
        tables.activities.retain(|a| !(a.id == id && visibility.allows(a.user_id)));
        Ok(tables.activities.len() < before)
    }

    async fn list_workouts(&self, visibility: Visibility) -> StoreResult<Vec<Workout>> {
        let tables = self.lock();
        let mut workouts: Vec<Workout> =
            tables.workouts.iter().filter(|w| visibility.allows(w.user_id)).cloned().collect();
        workouts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(workouts)
    }

    async fn get_workout(&self, id: Uuid, visibility: Visibility) -> StoreResult<Option<Workout>> {
        let tables = self.lock();
        Ok(tables
            .workouts
            .iter()
            .find(|w| w.id == id && visibility.allows(w.user_id))
            .cloned())
    }

    async fn insert_workout(&self, workout: &Workout) -> StoreResult<()> {
        let mut tables = self.lock();
        if !tables.users.iter().any(|u| u.id == workout.user_id) {
            return Err(StoreError::Database("workout owner does not exist".to_string()));
        }
        tables.workouts.push(workout.clone());
        Ok(())
    }

    async fn update_workout(&self, workout: &Workout) -> StoreResult<bool> {
        let mut tables = self.lock();
        Ok(replace(&mut tables.workouts, workout.clone(), |w| w.id == workout.id))
    }

    async fn complete_workout(&self, id: Uuid, visibility: Visibility) -> StoreResult<Option<Workout>> {
        let mut tables = self.lock();
        let workout = tables
            .workouts
            .iter_mut()
            .find(|w| w.id == id && visibility.allows(w.user_id));
        Ok(workout.map(|w| {
            w.completed = true;
            w.updated_at = Utc::now();
            w.clone()
        }))
    }

    async fn delete_workout(&self, id: Uuid, visibility: Visibility) -> StoreResult<bool> {
        let mut tables = self.lock();
        let before = tables.workouts.len();
        tables.workouts.retain(|w| !(w.id == id && visibility.allows(w.user_id)));
        Ok(tables.workouts.len() < before)
    }

    async fn list_leaderboard(&self, team_id: Option<Uuid>) -> StoreResult<Vec<LeaderboardEntry>> {
        let tables = self.lock();
        let mut entries: Vec<LeaderboardEntry> = tables
            .leaderboard
            .iter()
            .filter(|e| team_id.map_or(true, |id| e.team_id == Some(id)))
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            b.total_calories
                .total_cmp(&a.total_calories)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(entries)
    }

    async fn get_leaderboard_entry(&self, id: Uuid) -> StoreResult<Option<LeaderboardEntry>> {
        Ok(self.lock().leaderboard.iter().find(|e| e.id == id).cloned())
    }

    async fn insert_leaderboard_entry(&self, entry: &LeaderboardEntry) -> StoreResult<()> {
        let mut tables = self.lock();
        if tables.leaderboard.iter().any(|e| e.user_id == entry.user_id) {
            return Err(StoreError::Database("user already has a leaderboard entry".to_string()));
        }
        tables.leaderboard.push(entry.clone());
        Ok(())
    }

    async fn recompute_leaderboard(&self) -> StoreResult<u64> {
        let mut tables = self.lock();

        // user_id -> (calories, distance, count)
        let mut sums: HashMap<Uuid, (f64, f64, i32)> =
            tables.users.iter().map(|u| (u.id, (0.0, 0.0, 0))).collect();
        for activity in &tables.activities {
            if let Some(sum) = sums.get_mut(&activity.user_id) {
                sum.0 += activity.calories_burned;
                sum.1 += activity.distance_km.unwrap_or(0.0);
                sum.2 += 1;
            }
        }

        let mut totals: Vec<(Uuid, (f64, f64, i32))> = sums.into_iter().collect();
        totals.sort_by(|a, b| b.1 .0.total_cmp(&a.1 .0));
        let calories: Vec<f64> = totals.iter().map(|(_, sum)| sum.0).collect();
        let ranks = competition_ranks(&calories);

        let now = Utc::now();
        for ((user_id, (total_calories, total_distance, total_activities)), rank) in
            totals.iter().zip(ranks)
        {
            let first_team = tables
                .members
                .iter()
                .filter(|m| m.user_id == *user_id)
                .min_by_key(|m| m.created_at)
                .map(|m| m.team_id);

            let existing = tables.leaderboard.iter().position(|e| e.user_id == *user_id);
            match existing {
                Some(index) => {
                    let entry = &mut tables.leaderboard[index];
                    entry.team_id = entry.team_id.or(first_team);
                    entry.total_calories = *total_calories;
                    entry.total_distance = *total_distance;
                    entry.total_activities = *total_activities;
                    entry.rank = Some(rank);
                    entry.updated_at = now;
                }
                None => {
                    let mut entry = LeaderboardEntry::new(*user_id, first_team);
                    entry.total_calories = *total_calories;
                    entry.total_distance = *total_distance;
                    entry.total_activities = *total_activities;
                    entry.rank = Some(rank);
                    tables.leaderboard.push(entry);
                }
            }
        }

        Ok(totals.len() as u64)
    }

    async fn clear(&self) -> StoreResult<()> {
        *self.lock() = Tables::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store.insert_user(&User::new("a", "a@x.com")).await.unwrap();
        let err = store.insert_user(&User::new("b", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { field: "email", .. }));
    }

    #[tokio::test]
    async fn updating_a_user_keeps_its_own_email() {
        let store = MemoryStore::new();
        let mut user = User::new("a", "a@x.com");
        store.insert_user(&user).await.unwrap();
        user.bio = Some("hi".to_string());
        store.update_user(&user).await.unwrap();
        let loaded = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(loaded.bio.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn updating_a_deleted_row_reports_it() {
        let store = MemoryStore::new();
        let user = User::new("a", "a@x.com");
        store.insert_user(&user).await.unwrap();
        let team = Team::new("Heroes", user.id);
        store.insert_team(&team).await.unwrap();
        let workout = Workout::new(user.id, "Legs", "Squats", 45, Difficulty::Hard);
        store.insert_workout(&workout).await.unwrap();

        assert!(store.update_team(&team).await.unwrap());
        store.delete_team(team.id).await.unwrap();
        assert!(!store.update_team(&team).await.unwrap());

        store.delete_workout(workout.id, Visibility::All).await.unwrap();
        assert!(!store.update_workout(&workout).await.unwrap());
        assert!(store.complete_workout(workout.id, Visibility::All).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn completing_a_workout_touches_only_the_flag() {
        let store = MemoryStore::new();
        let owner = User::new("owner", "o@x.com");
        let other = User::new("other", "x@x.com");
        store.insert_user(&owner).await.unwrap();
        store.insert_user(&other).await.unwrap();
        let workout = Workout::new(owner.id, "Legs", "Squats", 45, Difficulty::Hard);
        store.insert_workout(&workout).await.unwrap();

        let hidden = store.complete_workout(workout.id, Visibility::OwnedBy(other.id)).await.unwrap();
        assert!(hidden.is_none());

        // An edit saved between the read and the completion survives it.
        let mut renamed = workout.clone();
        renamed.title = "Leg day".to_string();
        store.update_workout(&renamed).await.unwrap();

        let done = store
            .complete_workout(workout.id, Visibility::OwnedBy(owner.id))
            .await
            .unwrap()
            .unwrap();
        assert!(done.completed);
        assert_eq!(done.title, "Leg day");
        assert!(store.get_workout(workout.id, Visibility::All).await.unwrap().unwrap().completed);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades() {
        let store = MemoryStore::new();
        let owner = User::new("owner", "o@x.com");
        let other = User::new("other", "x@x.com");
        store.insert_user(&owner).await.unwrap();
        store.insert_user(&other).await.unwrap();

        let team = Team::new("Heroes", owner.id);
        store.insert_team(&team).await.unwrap();
        store.add_member(team.id, other.id).await.unwrap();
        store
            .insert_activity(&Activity::new(owner.id, ActivityType::Running, 30, 300.0, day(1)))
            .await
            .unwrap();
        store
            .insert_workout(&Workout::new(owner.id, "Legs", "Squats", 45, Difficulty::Hard))
            .await
            .unwrap();
        store.recompute_leaderboard().await.unwrap();

        assert!(store.delete_user(owner.id).await.unwrap());

        assert!(store.get_team(team.id).await.unwrap().is_none());
        assert!(store.memberships(&[team.id]).await.unwrap().is_empty());
        assert!(store.list_activities(Visibility::All, None).await.unwrap().is_empty());
        assert!(store.list_workouts(Visibility::All).await.unwrap().is_empty());
        // The other user's entry pointed at the deleted team and goes with it.
        assert!(store.list_leaderboard(None).await.unwrap().is_empty());
        assert!(store.get_user(other.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn add_member_is_unique_per_team() {
        let store = MemoryStore::new();
        let user = User::new("a", "a@x.com");
        store.insert_user(&user).await.unwrap();
        let team = Team::new("Heroes", user.id);
        store.insert_team(&team).await.unwrap();

        assert!(store.add_member(team.id, user.id).await.unwrap());
        assert!(!store.add_member(team.id, user.id).await.unwrap());
        assert_eq!(store.memberships(&[team.id]).await.unwrap().len(), 1);
        assert!(store.remove_member(team.id, user.id).await.unwrap());
        assert!(!store.remove_member(team.id, user.id).await.unwrap());
    }

    #[tokio::test]
    async fn activities_are_newest_date_first_and_scoped() {
        let store = MemoryStore::new();
        let a = User::new("a", "a@x.com");
        let b = User::new("b", "b@x.com");
        store.insert_user(&a).await.unwrap();
        store.insert_user(&b).await.unwrap();
        store
            .insert_activity(&Activity::new(a.id, ActivityType::Yoga, 20, 80.0, day(1)))
            .await
            .unwrap();
        store
            .insert_activity(&Activity::new(a.id, ActivityType::Running, 30, 300.0, day(3)))
            .await
            .unwrap();
        store
            .insert_activity(&Activity::new(b.id, ActivityType::Running, 30, 300.0, day(2)))
            .await
            .unwrap();

        let own = store.list_activities(Visibility::OwnedBy(a.id), None).await.unwrap();
        assert_eq!(own.len(), 2);
        assert_eq!(own[0].date, day(3));

        let all_running = store
            .list_activities(Visibility::All, Some(ActivityType::Running))
            .await
            .unwrap();
        assert_eq!(all_running.len(), 2);
        assert_eq!(all_running[0].user_id, a.id);
    }

    #[tokio::test]
    async fn recompute_sums_and_ranks() {
        let store = MemoryStore::new();
        let a = User::new("a", "a@x.com");
        let b = User::new("b", "b@x.com");
        let c = User::new("c", "c@x.com");
        for user in [&a, &b, &c] {
            store.insert_user(user).await.unwrap();
        }
        let team = Team::new("Heroes", a.id);
        store.insert_team(&team).await.unwrap();
        store.add_member(team.id, b.id).await.unwrap();

        let mut run = Activity::new(a.id, ActivityType::Running, 30, 300.0, day(1));
        run.distance_km = Some(5.0);
        store.insert_activity(&run).await.unwrap();
        store
            .insert_activity(&Activity::new(a.id, ActivityType::Yoga, 20, 100.0, day(2)))
            .await
            .unwrap();
        store
            .insert_activity(&Activity::new(b.id, ActivityType::Cycling, 60, 400.0, day(2)))
            .await
            .unwrap();

        assert_eq!(store.recompute_leaderboard().await.unwrap(), 3);

        let board = store.list_leaderboard(None).await.unwrap();
        assert_eq!(board.len(), 3);
        assert_eq!(board[0].total_calories, 400.0);
        assert_eq!(board[0].rank, Some(1));
        assert_eq!(board[1].total_calories, 400.0);
        assert_eq!(board[1].rank, Some(1));
        assert_eq!(board[2].user_id, c.id);
        assert_eq!(board[2].total_activities, 0);
        assert_eq!(board[2].rank, Some(3));

        let a_entry = board.iter().find(|e| e.user_id == a.id).unwrap();
        assert_eq!(a_entry.total_distance, 5.0);
        assert_eq!(a_entry.team_id, None);
        let b_entry = board.iter().find(|e| e.user_id == b.id).unwrap();
        assert_eq!(b_entry.team_id, Some(team.id));

        let by_team = store.list_leaderboard(Some(team.id)).await.unwrap();
        assert_eq!(by_team.len(), 1);
        assert_eq!(by_team[0].user_id, b.id);
    }
}
