use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use std::future::Future;
use std::pin::Pin;

use crate::config::Config;
use crate::db::SharedStore;
use crate::errors::AppError;
use crate::models::User;
use crate::utils::jwt::{validate_token, Claims};

/// The authenticated user making the request.
///
/// Claims already verified by the bearer middleware are reused; otherwise the
/// `Authorization` header is checked here, so routes that are readable
/// anonymously can still demand a caller for writes.
pub struct Caller(pub User);

impl Caller {
    pub fn user(&self) -> &User {
        &self.0
    }
}

fn claims_from(req: &HttpRequest) -> Result<Claims, AppError> {
    if let Some(claims) = req.extensions().get::<Claims>() {
        return Ok(claims.clone());
    }

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided".to_string())
        })?;

    let config = req
        .app_data::<web::Data<Config>>()
        .ok_or_else(|| AppError::InternalServerError("Configuration missing".to_string()))?;

    validate_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
}

impl FromRequest for Caller {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = claims_from(req);
        let store = req.app_data::<SharedStore>().cloned();

        Box::pin(async move {
            let claims = claims?;
            let store = store
                .ok_or_else(|| AppError::InternalServerError("Store missing".to_string()))?;
            let user_id = claims
                .user_id()
                .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;

            store
                .get_user(user_id)
                .await?
                .map(Caller)
                .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))
        })
    }
}
