use actix_web::{web, HttpResponse};
use log::info;
use uuid::Uuid;

use crate::db::{SharedStore, Visibility};
use crate::errors::AppError;
use crate::models::Workout;
use crate::serializers::workout::{expand_workout, expand_workouts};
use crate::serializers::{WorkoutWrite, WriteMode};
use crate::utils::auth::Caller;

fn not_found() -> AppError {
    AppError::NotFound("Workout not found".to_string())
}

async fn find_workout(store: &SharedStore, caller: &Caller, id: Uuid) -> Result<Workout, AppError> {
    store
        .get_workout(id, Visibility::for_user(caller.user()))
        .await?
        .ok_or_else(not_found)
}

// GET /api/workouts/
pub async fn list_workouts(caller: Caller, store: SharedStore) -> Result<HttpResponse, AppError> {
    let workouts = store.list_workouts(Visibility::for_user(caller.user())).await?;
    Ok(HttpResponse::Ok().json(expand_workouts(store.get_ref(), workouts).await?))
}

// POST /api/workouts/
pub async fn create_workout(
    caller: Caller,
    store: SharedStore,
    payload: web::Json<WorkoutWrite>,
) -> Result<HttpResponse, AppError> {
    payload.check(WriteMode::Create)?;

    let workout = payload.into_inner().into_workout(caller.user().id);
    store.insert_workout(&workout).await?;
    info!("User {} created workout {}", caller.user().id, workout.id);

    Ok(HttpResponse::Created().json(expand_workout(store.get_ref(), workout).await?))
}

// GET /api/workouts/{id}/
pub async fn get_workout(
    caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let workout = find_workout(&store, &caller, *id).await?;
    Ok(HttpResponse::Ok().json(expand_workout(store.get_ref(), workout).await?))
}

async fn write_workout(
    caller: Caller,
    store: SharedStore,
    id: Uuid,
    payload: WorkoutWrite,
    mode: WriteMode,
) -> Result<HttpResponse, AppError> {
    payload.check(mode)?;
    let mut workout = find_workout(&store, &caller, id).await?;
    payload.apply(&mut workout);
    if !store.update_workout(&workout).await? {
        return Err(not_found());
    }
    Ok(HttpResponse::Ok().json(expand_workout(store.get_ref(), workout).await?))
}

// PUT /api/workouts/{id}/
pub async fn replace_workout(
    caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
    payload: web::Json<WorkoutWrite>,
) -> Result<HttpResponse, AppError> {
    write_workout(caller, store, *id, payload.into_inner(), WriteMode::Replace).await
}

// PATCH /api/workouts/{id}/
pub async fn patch_workout(
    caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
    payload: web::Json<WorkoutWrite>,
) -> Result<HttpResponse, AppError> {
    write_workout(caller, store, *id, payload.into_inner(), WriteMode::Partial).await
}

// DELETE /api/workouts/{id}/
pub async fn delete_workout(
    caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let deleted = store
        .delete_workout(*id, Visibility::for_user(caller.user()))
        .await?;
    if !deleted {
        return Err(not_found());
    }
    info!("User {} deleted workout {}", caller.user().id, *id);
    Ok(HttpResponse::NoContent().finish())
}

// POST /api/workouts/{id}/mark_completed/
pub async fn mark_completed(
    caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    // There is no way back to incomplete through this action.
    let workout = store
        .complete_workout(*id, Visibility::for_user(caller.user()))
        .await?
        .ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().json(expand_workout(store.get_ref(), workout).await?))
}
