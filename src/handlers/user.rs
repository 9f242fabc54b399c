use actix_web::{web, HttpResponse};
use log::info;
use uuid::Uuid;

use crate::db::SharedStore;
use crate::errors::AppError;
use crate::handlers::auth::hash_password;
use crate::serializers::{UserRepr, UserWrite, WriteMode};
use crate::utils::auth::Caller;

fn not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

// GET /api/users/
pub async fn list_users(store: SharedStore) -> Result<HttpResponse, AppError> {
    let users = store.list_users().await?;
    let body: Vec<UserRepr> = users.iter().map(UserRepr::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

// GET /api/users/me/
pub async fn me(caller: Caller) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(UserRepr::from(caller.user())))
}

// GET /api/users/{id}/
pub async fn get_user(store: SharedStore, id: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    let user = store.get_user(*id).await?.ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(UserRepr::from(&user)))
}

// POST /api/users/
pub async fn create_user(
    _caller: Caller,
    store: SharedStore,
    payload: web::Json<UserWrite>,
) -> Result<HttpResponse, AppError> {
    payload.check(WriteMode::Create)?;
    let mut payload = payload.into_inner();

    let password_hash = match payload.password.take() {
        Some(password) => Some(hash_password(password).await?),
        None => None,
    };

    let mut user = payload.into_user();
    user.password_hash = password_hash;
    store.insert_user(&user).await?;
    info!("Created user {} ({})", user.username, user.id);

    Ok(HttpResponse::Created().json(UserRepr::from(&user)))
}

async fn write_user(
    store: SharedStore,
    id: Uuid,
    payload: UserWrite,
    mode: WriteMode,
) -> Result<HttpResponse, AppError> {
    payload.check(mode)?;
    let mut payload = payload;
    let mut user = store.get_user(id).await?.ok_or_else(not_found)?;

    if let Some(password) = payload.password.take() {
        user.password_hash = Some(hash_password(password).await?);
    }
    payload.apply(&mut user);
    if !store.update_user(&user).await? {
        return Err(not_found());
    }

    Ok(HttpResponse::Ok().json(UserRepr::from(&user)))
}

// PUT /api/users/{id}/
pub async fn replace_user(
    _caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
    payload: web::Json<UserWrite>,
) -> Result<HttpResponse, AppError> {
    write_user(store, *id, payload.into_inner(), WriteMode::Replace).await
}

// PATCH /api/users/{id}/
pub async fn patch_user(
    _caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
    payload: web::Json<UserWrite>,
) -> Result<HttpResponse, AppError> {
    write_user(store, *id, payload.into_inner(), WriteMode::Partial).await
}

// DELETE /api/users/{id}/
pub async fn delete_user(
    _caller: Caller,
    store: SharedStore,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    if !store.delete_user(*id).await? {
        return Err(not_found());
    }
    info!("Deleted user {}", *id);
    Ok(HttpResponse::NoContent().finish())
}
