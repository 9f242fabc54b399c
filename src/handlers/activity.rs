use actix_web::{web, HttpResponse};
use log::info;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{SharedStore, Visibility};
use crate::errors::AppError;
use crate::models::{Activity, ActivityType};
use crate::serializers::activity::{expand_activities, expand_activity};
use crate::serializers::{ActivityWrite, WriteMode};
use crate::utils::auth::Caller;

#[derive(Deserialize)]
pub struct ByTypeQuery {
    #[serde(rename = "type")]
    activity_type: Option<String>,
}

async fn find_activity(store: &SharedStore, caller: &Caller, id: Uuid) -> Result<Activity, AppError> {
    store
        .get_activity(id, Visibility::for_user(caller.user()))
        .await?
        .ok_or_else(|| AppError::NotFound("Activity not found".to_string()))
}

// GET /api/activities/
pub async fn list_activities(caller: Caller, store: SharedStore) -> Result<HttpResponse, AppError> {
    let activities = store
        .list_activities(Visibility::for_user(caller.user()), None)
        .await?;
    Ok(HttpResponse::Ok().json(expand_activities(store.get_ref(), activities).await?))
}

// GET /api/activities/by_type/?type=<activity_type>
pub async fn activities_by_type(
    caller: Caller,
    store: SharedStore,
    query: web::Query<ByTypeQuery>,
) -> Result<HttpResponse, AppError> {
    let raw = query
        .activity_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("activity_type parameter required".to_string()))?;

    // A value outside the enumeration matches nothing.
    let activity_type = match raw.parse::<ActivityType>() {
        Ok(activity_type) => activity_type,
        Err(_) => return Ok(HttpResponse::Ok().json(Vec::<()>::new())),
    };

    let activities = store
        .list_activities(Visibility::for_user(caller.user()), Some(activity_type))
        .await?;
    Ok(HttpResponse::Ok().json(expand_activities(store.get_ref(), activities).await?))
}

// POST /api/activities/
pub async fn create_activity(
    caller: Caller,
    store: SharedStore,
    payload: web::Json<ActivityWrite>,
) -> Result<HttpResponse, AppError> {
    payload.check(WriteMode::Create)?;

    let activity = payload.into_inner().into_activity(caller.user().id);
    store.insert_activity(&activity).await?;
    info!(
        "User {} logged {} activity {}",
        caller.user().id,
        activity.activity_type.as_str(),
        activity.id
    );

    Ok(HttpResponse::Created().json(expand_activity(store.get_ref(), activity).await?))
}

// GET /api/activities/{id}/
pub async fn get_activity(
    caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let activity = find_activity(&store, &caller, *id).await?;
    Ok(HttpResponse::Ok().json(expand_activity(store.get_ref(), activity).await?))
}

async fn write_activity(
    caller: Caller,
    store: SharedStore,
    id: Uuid,
    payload: ActivityWrite,
    mode: WriteMode,
) -> Result<HttpResponse, AppError> {
    payload.check(mode)?;
    let mut activity = find_activity(&store, &caller, id).await?;
    payload.apply(&mut activity);
    if !store.update_activity(&activity).await? {
        return Err(AppError::NotFound("Activity not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(expand_activity(store.get_ref(), activity).await?))
}

// PUT /api/activities/{id}/
pub async fn replace_activity(
    caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
    payload: web::Json<ActivityWrite>,
) -> Result<HttpResponse, AppError> {
    write_activity(caller, store, *id, payload.into_inner(), WriteMode::Replace).await
}

// PATCH /api/activities/{id}/
pub async fn patch_activity(
    caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
    payload: web::Json<ActivityWrite>,
) -> Result<HttpResponse, AppError> {
    write_activity(caller, store, *id, payload.into_inner(), WriteMode::Partial).await
}

// DELETE /api/activities/{id}/
pub async fn delete_activity(
    caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let deleted = store
        .delete_activity(*id, Visibility::for_user(caller.user()))
        .await?;
    if !deleted {
        return Err(AppError::NotFound("Activity not found".to_string()));
    }
    info!("User {} deleted activity {}", caller.user().id, *id);
    Ok(HttpResponse::NoContent().finish())
}
