use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use super::{embed_user, load_users, nullable, UserRepr, WriteMode};
use crate::db::Store;
use crate::errors::AppError;
use crate::models::Team;
use crate::utils::validation::Checker;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TeamRepr {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<UserRepr>,
    pub created_by: UserRepr,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Embeds creator and members (in join order) for each team.
pub async fn expand_teams(store: &dyn Store, teams: Vec<Team>) -> Result<Vec<TeamRepr>, AppError> {
    if teams.is_empty() {
        return Ok(Vec::new());
    }
    let team_ids: Vec<Uuid> = teams.iter().map(|t| t.id).collect();
    let memberships = store.memberships(&team_ids).await?;
    let users = load_users(
        store,
        memberships
            .iter()
            .map(|m| m.user_id)
            .chain(teams.iter().map(|t| t.created_by)),
    )
    .await?;

    teams
        .into_iter()
        .map(|team| {
            let members = memberships
                .iter()
                .filter(|m| m.team_id == team.id)
                .map(|m| embed_user(&users, m.user_id))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TeamRepr {
                id: team.id,
                name: team.name,
                description: team.description,
                members,
                created_by: embed_user(&users, team.created_by)?,
                created_at: team.created_at,
                updated_at: team.updated_at,
            })
        })
        .collect()
}

pub async fn expand_team(store: &dyn Store, team: Team) -> Result<TeamRepr, AppError> {
    expand_teams(store, vec![team])
        .await?
        .pop()
        .ok_or_else(|| AppError::InternalServerError("Team expansion failed".to_string()))
}

#[derive(Deserialize, Validate, Default, Debug)]
pub struct TeamWrite {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

impl TeamWrite {
    pub fn check(&self, mode: WriteMode) -> Result<(), AppError> {
        let mut checker = Checker::new(self);
        if mode.requires_all() {
            checker.require("name", &self.name);
        }
        checker.finish()
    }

    /// `created_by` always comes from the authenticated caller.
    pub fn into_team(self, created_by: Uuid) -> Team {
        let mut team = Team::new(self.name.as_deref().unwrap_or_default(), created_by);
        self.apply(&mut team);
        team
    }

    pub fn apply(self, team: &mut Team) {
        if let Some(name) = self.name {
            team.name = name;
        }
        if let Some(description) = self.description {
            team.description = description;
        }
        team.updated_at = Utc::now();
    }
}

/// Body of add_member / remove_member.
#[derive(Deserialize, Debug, Default)]
pub struct MemberRequest {
    #[serde(default)]
    pub user_id: Option<Value>,
}

impl MemberRequest {
    /// `None` when the id is missing or not a valid identifier.
    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_by_in_payload_is_ignored() {
        let caller = Uuid::now_v7();
        let payload: TeamWrite = serde_json::from_str(&format!(
            r#"{{"name": "Heroes", "created_by": "{}", "members": []}}"#,
            Uuid::now_v7()
        ))
        .unwrap();
        assert!(payload.check(WriteMode::Create).is_ok());
        let team = payload.into_team(caller);
        assert_eq!(team.created_by, caller);
        assert_eq!(team.name, "Heroes");
    }

    #[test]
    fn member_request_tolerates_garbage() {
        let id = Uuid::now_v7();
        let ok: MemberRequest = serde_json::from_str(&format!(r#"{{"user_id": "{}"}}"#, id)).unwrap();
        assert_eq!(ok.user_id(), Some(id));

        let numeric: MemberRequest = serde_json::from_str(r#"{"user_id": 7}"#).unwrap();
        assert_eq!(numeric.user_id(), None);

        let missing: MemberRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.user_id(), None);
    }
}
