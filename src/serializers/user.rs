use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{nullable, WriteMode};
use crate::errors::AppError;
use crate::models::User;
use crate::utils::validation::{Checker, USERNAME_RE};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserRepr {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserRepr {
    fn from(user: &User) -> Self {
        UserRepr {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            bio: user.bio.clone(),
            profile_picture: user.profile_picture.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Deserialize, Validate, Default, Debug)]
pub struct UserWrite {
    #[validate(length(min = 1, max = 150, message = "Username must be between 1 and 150 characters"))]
    #[validate(regex(
        path = "USERNAME_RE",
        message = "Username may contain only letters, numbers, and @/./+/-/_ characters"
    ))]
    pub username: Option<String>,

    #[validate(email(message = "Enter a valid email address."))]
    #[validate(length(max = 254, message = "Email must be at most 254 characters"))]
    pub email: Option<String>,

    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub bio: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub profile_picture: Option<Option<String>>,

    /// Write-only. Hashed by the handler, never echoed back.
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: Option<String>,
}

impl UserWrite {
    pub fn check(&self, mode: WriteMode) -> Result<(), AppError> {
        let mut checker = Checker::new(self);
        let profile_picture = self.profile_picture.as_ref().and_then(|p| p.as_deref());
        checker.max_length("profile_picture", profile_picture, 200);
        checker.url("profile_picture", profile_picture);
        if mode.requires_all() {
            checker.require("username", &self.username);
            checker.require("email", &self.email);
        }
        checker.finish()
    }

    /// Builds a new user. `check(WriteMode::Create)` must have passed.
    pub fn into_user(self) -> User {
        let mut user = User::new(
            self.username.as_deref().unwrap_or_default(),
            self.email.as_deref().unwrap_or_default(),
        );
        self.apply(&mut user);
        user
    }

    /// Copies the provided fields onto `user`. The password is left to the caller.
    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(bio) = self.bio {
            user.bio = bio;
        }
        if let Some(profile_picture) = self.profile_picture {
            user.profile_picture = profile_picture;
        }
        user.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(json: &str) -> UserWrite {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn read_only_fields_are_dropped() {
        let payload = write(r#"{"id": "00000000-0000-0000-0000-000000000000", "username": "a", "email": "a@x.com", "created_at": "x"}"#);
        assert!(payload.check(WriteMode::Create).is_ok());
        let user = payload.into_user();
        assert_ne!(user.id, Uuid::nil());
    }

    #[test]
    fn create_requires_username_and_email() {
        match write("{}").check(WriteMode::Create) {
            Err(AppError::Validation(fields)) => {
                assert!(fields.contains_key("username"));
                assert!(fields.contains_key("email"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(write("{}").check(WriteMode::Partial).is_ok());
    }

    #[test]
    fn bad_email_and_picture_are_reported() {
        let payload = write(r#"{"email": "nope", "profile_picture": "not-a-url"}"#);
        match payload.check(WriteMode::Partial) {
            Err(AppError::Validation(fields)) => {
                assert!(fields.contains_key("email"));
                assert!(fields.contains_key("profile_picture"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn null_clears_optional_fields() {
        let mut user = User::new("a", "a@x.com");
        user.bio = Some("old".to_string());
        user.profile_picture = Some("https://example.com/a.png".to_string());
        write(r#"{"bio": null}"#).apply(&mut user);
        assert_eq!(user.bio, None);
        assert!(user.profile_picture.is_some());
    }
}
