use actix_web::{web, HttpResponse};
use log::info;
use serde_json::json;
use uuid::Uuid;

use crate::db::SharedStore;
use crate::errors::AppError;
use crate::models::{Team, User};
use crate::serializers::team::{expand_team, expand_teams};
use crate::serializers::{MemberRequest, TeamWrite, WriteMode};
use crate::utils::auth::Caller;

async fn find_team(store: &SharedStore, id: Uuid) -> Result<Team, AppError> {
    store
        .get_team(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))
}

/// Resolves the `user_id` of a membership request. Missing, malformed and
/// unknown ids all read as "not found".
/// A missing or unreadable body is treated like a missing `user_id`.
async fn find_member(
    store: &SharedStore,
    payload: Option<&MemberRequest>,
) -> Result<User, AppError> {
    let not_found = || AppError::NotFound("User not found".to_string());
    let user_id = payload.and_then(MemberRequest::user_id).ok_or_else(not_found)?;
    store.get_user(user_id).await?.ok_or_else(not_found)
}

// GET /api/teams/
pub async fn list_teams(store: SharedStore) -> Result<HttpResponse, AppError> {
    let teams = store.list_teams().await?;
    let body = expand_teams(store.get_ref(), teams).await?;
    Ok(HttpResponse::Ok().json(body))
}

// GET /api/teams/{id}/
pub async fn get_team(store: SharedStore, id: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    let team = find_team(&store, *id).await?;
    Ok(HttpResponse::Ok().json(expand_team(store.get_ref(), team).await?))
}

// POST /api/teams/
pub async fn create_team(
    caller: Caller,
    store: SharedStore,
    payload: web::Json<TeamWrite>,
) -> Result<HttpResponse, AppError> {
    payload.check(WriteMode::Create)?;

    let team = payload.into_inner().into_team(caller.user().id);
    store.insert_team(&team).await?;
    info!("User {} created team {} ({})", caller.user().id, team.name, team.id);

    Ok(HttpResponse::Created().json(expand_team(store.get_ref(), team).await?))
}

async fn write_team(
    store: SharedStore,
    id: Uuid,
    payload: TeamWrite,
    mode: WriteMode,
) -> Result<HttpResponse, AppError> {
    payload.check(mode)?;
    let mut team = find_team(&store, id).await?;
    payload.apply(&mut team);
    if !store.update_team(&team).await? {
        return Err(AppError::NotFound("Team not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(expand_team(store.get_ref(), team).await?))
}

// PUT /api/teams/{id}/
pub async fn replace_team(
    _caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
    payload: web::Json<TeamWrite>,
) -> Result<HttpResponse, AppError> {
    write_team(store, *id, payload.into_inner(), WriteMode::Replace).await
}

// PATCH /api/teams/{id}/
pub async fn patch_team(
    _caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
    payload: web::Json<TeamWrite>,
) -> Result<HttpResponse, AppError> {
    write_team(store, *id, payload.into_inner(), WriteMode::Partial).await
}

// DELETE /api/teams/{id}/
pub async fn delete_team(
    _caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    if !store.delete_team(*id).await? {
        return Err(AppError::NotFound("Team not found".to_string()));
    }
    info!("Deleted team {}", *id);
    Ok(HttpResponse::NoContent().finish())
}

// POST /api/teams/{id}/add_member/
pub async fn add_member(
    _caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
    payload: Option<web::Json<MemberRequest>>,
) -> Result<HttpResponse, AppError> {
    let team = find_team(&store, *id).await?;
    let user = find_member(&store, payload.as_deref()).await?;

    if store.add_member(team.id, user.id).await? {
        info!("Added user {} to team {}", user.id, team.id);
    }
    Ok(HttpResponse::Ok().json(json!({ "status": "user added to team" })))
}

// POST /api/teams/{id}/remove_member/
pub async fn remove_member(
    _caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
    payload: Option<web::Json<MemberRequest>>,
) -> Result<HttpResponse, AppError> {
    let team = find_team(&store, *id).await?;
    let user = find_member(&store, payload.as_deref()).await?;

    // Removing a non-member succeeds without change.
    if store.remove_member(team.id, user.id).await? {
        info!("Removed user {} from team {}", user.id, team.id);
    }
    Ok(HttpResponse::Ok().json(json!({ "status": "user removed from team" })))
}
