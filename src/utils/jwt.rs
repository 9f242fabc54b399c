use actix_web::dev::ServiceRequest;
use actix_web::{web, Error, HttpMessage};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use chrono::{TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Generates a JWT token for the given user.
pub fn generate_token(
    user_id: Uuid,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = TimeDelta::try_hours(ttl_hours)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| jsonwebtoken::errors::Error::from(ErrorKind::MissingRequiredClaim("exp".to_string())))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validates a JWT token and returns the claims if valid.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(jsonwebtoken::Algorithm::HS256),
    )
    .map(|data| data.claims)
}

/// Validator function for the `HttpAuthentication::with_fn` middleware.
/// Valid claims are stored in the request extensions for the `Caller` extractor.
/// A missing header is rejected here too, so every 401 carries the JSON error body.
pub async fn validator(
    req: ServiceRequest,
    credentials: Option<BearerAuth>,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let credentials = match credentials {
        Some(credentials) => credentials,
        None => {
            return Err((
                AppError::Unauthorized("Authentication credentials were not provided".to_string()).into(),
                req,
            ))
        }
    };

    let secret = match req.app_data::<web::Data<Config>>() {
        Some(config) => config.jwt_secret.clone(),
        None => {
            return Err((
                AppError::InternalServerError("Configuration missing".to_string()).into(),
                req,
            ))
        }
    };

    match validate_token(credentials.token(), &secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(req)
        }
        Err(_) => Err((AppError::Unauthorized("Invalid token".to_string()).into(), req)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_carries_the_user_id() {
        let user_id = Uuid::now_v7();
        let token = generate_token(user_id, "secret", 1).unwrap();
        let claims = validate_token(&token, "secret").unwrap();
        assert_eq!(claims.user_id(), Some(user_id));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_token(Uuid::now_v7(), "secret", 1).unwrap();
        assert!(validate_token(&token, "other").is_err());
    }

    #[test]
    fn unrepresentable_lifetime_is_an_error() {
        assert!(generate_token(Uuid::now_v7(), "secret", i64::MAX).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = generate_token(Uuid::now_v7(), "secret", -2).unwrap();
        assert!(validate_token(&token, "secret").is_err());
    }
}
