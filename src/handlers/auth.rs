use actix_web::rt::task::spawn_blocking;
use actix_web::{web, HttpResponse};
use bcrypt::{hash, verify};
use log::info;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::Config;
use crate::db::SharedStore;
use crate::errors::AppError;
use crate::models::User;
use crate::serializers::UserRepr;
use crate::utils::jwt::generate_token;
use crate::utils::validation::{Checker, USERNAME_RE};

const BCRYPT_COST: u32 = 10;

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150, message = "Username must be between 1 and 150 characters"))]
    #[validate(regex(
        path = "USERNAME_RE",
        message = "Username may contain only letters, numbers, and @/./+/-/_ characters"
    ))]
    username: String,

    #[validate(email(message = "Enter a valid email address."))]
    #[validate(length(max = 254, message = "Email must be at most 254 characters"))]
    email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    password: String,

    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    #[serde(default)]
    first_name: String,

    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    #[serde(default)]
    last_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub user: UserRepr,
    pub token: String,
}

/// Hashes a password off the async workers.
pub(crate) async fn hash_password(password: String) -> Result<String, AppError> {
    spawn_blocking(move || hash(&password, BCRYPT_COST))
        .await
        .map_err(|_| AppError::InternalServerError("Hashing failed".to_string()))?
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

async fn issue_token(user: &User, config: &Config) -> Result<String, AppError> {
    let user_id = user.id;
    let secret = config.jwt_secret.clone();
    let ttl_hours = config.token_ttl_hours;

    spawn_blocking(move || generate_token(user_id, &secret, ttl_hours))
        .await
        .map_err(|_| AppError::InternalServerError("Token generation failed".to_string()))?
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

// POST /api/auth/register/
pub async fn register(
    req: web::Json<RegisterRequest>,
    store: SharedStore,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    Checker::new(&*req).finish()?;
    let req = req.into_inner();

    let mut user = User::new(&req.username, &req.email);
    user.first_name = req.first_name;
    user.last_name = req.last_name;
    user.password_hash = Some(hash_password(req.password).await?);

    store.insert_user(&user).await?;
    info!("Registered user {} ({})", user.username, user.id);

    let token = issue_token(&user, &config).await?;
    Ok(HttpResponse::Created().json(AuthResponse {
        user: UserRepr::from(&user),
        token,
    }))
}

// POST /api/auth/login/
pub async fn login(
    req: web::Json<LoginRequest>,
    store: SharedStore,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();

    let user = store
        .get_user_by_username(&req.username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let stored_hash = user
        .password_hash
        .clone()
        .ok_or_else(|| AppError::Unauthorized("Invalid password".to_string()))?;

    let password = req.password;
    let is_valid = spawn_blocking(move || verify(password.as_str(), &stored_hash))
        .await
        .map_err(|_| AppError::InternalServerError("Password verification error".to_string()))?
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    if !is_valid {
        return Err(AppError::Unauthorized("Invalid password".to_string()));
    }

    let token = issue_token(&user, &config).await?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        user: UserRepr::from(&user),
        token,
    }))
}
