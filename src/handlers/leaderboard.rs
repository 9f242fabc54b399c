use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::SharedStore;
use crate::errors::AppError;
use crate::serializers::leaderboard::expand_entries;

#[derive(Deserialize)]
pub struct ByTeamQuery {
    team_id: Option<String>,
}

// GET /api/leaderboard/
pub async fn list_leaderboard(store: SharedStore) -> Result<HttpResponse, AppError> {
    let entries = store.list_leaderboard(None).await?;
    Ok(HttpResponse::Ok().json(expand_entries(store.get_ref(), entries).await?))
}

// GET /api/leaderboard/{id}/
pub async fn get_entry(store: SharedStore, id: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    let entry = store
        .get_leaderboard_entry(*id)
        .await?
        .ok_or_else(|| AppError::NotFound("Leaderboard entry not found".to_string()))?;
    let body = expand_entries(store.get_ref(), vec![entry])
        .await?
        .pop()
        .ok_or_else(|| AppError::InternalServerError("Leaderboard expansion failed".to_string()))?;
    Ok(HttpResponse::Ok().json(body))
}

// GET /api/leaderboard/by_team/?team_id=<id>
pub async fn by_team(
    store: SharedStore,
    query: web::Query<ByTeamQuery>,
) -> Result<HttpResponse, AppError> {
    let raw = query
        .team_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("team_id parameter required".to_string()))?;

    // An id that cannot name a team matches nothing.
    let team_id = match Uuid::parse_str(raw) {
        Ok(team_id) => team_id,
        Err(_) => return Ok(HttpResponse::Ok().json(Vec::<()>::new())),
    };

    let entries = store.list_leaderboard(Some(team_id)).await?;
    Ok(HttpResponse::Ok().json(expand_entries(store.get_ref(), entries).await?))
}
