use lazy_static::lazy_static;
use regex::Regex;
use std::str::FromStr;
use validator::Validate;

use crate::errors::{collect_field_errors, AppError, FieldErrors};

lazy_static! {
    pub static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").expect("valid username pattern");
}

pub const REQUIRED: &str = "This field is required.";

/// Collects per-field problems before a write is accepted.
#[derive(Default)]
pub struct Checker {
    errors: FieldErrors,
}

impl Checker {
    /// Starts from the derive-based rules of `payload`.
    pub fn new<T: Validate>(payload: &T) -> Self {
        let errors = match payload.validate() {
            Ok(()) => FieldErrors::new(),
            Err(err) => collect_field_errors(&err),
        };
        Checker { errors }
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.errors.entry(field.to_string()).or_default().push(message.to_string());
    }

    pub fn require<T>(&mut self, field: &str, value: &Option<T>) {
        if value.is_none() {
            self.add(field, REQUIRED);
        }
    }

    pub fn url(&mut self, field: &str, value: Option<&str>) {
        if let Some(uri) = value {
            if !is_valid_url(uri) {
                self.add(field, "Enter a valid URL.");
            }
        }
    }

    /// For fields the derive cannot reach, such as nullable ones.
    pub fn max_length(&mut self, field: &str, value: Option<&str>, max: usize) {
        if matches!(value, Some(v) if v.chars().count() > max) {
            self.add(field, &format!("Ensure this field has no more than {} characters.", max));
        }
    }

    /// Reports a value that is not one of `T`'s choices.
    pub fn choice<T: FromStr>(&mut self, field: &str, value: Option<&str>) {
        if let Some(raw) = value {
            if raw.parse::<T>().is_err() {
                self.add(field, &format!("\"{}\" is not a valid choice.", raw));
            }
        }
    }

    pub fn non_negative(&mut self, field: &str, value: Option<f64>) {
        if matches!(value, Some(v) if v < 0.0) {
            self.add(field, "Ensure this value is greater than or equal to 0.");
        }
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

const URL_SCHEMES: [&str; 4] = ["http://", "https://", "ftp://", "ftps://"];

/// Absolute URL with a web or ftp scheme. Hostnames, `localhost` and IP hosts all pass.
pub fn is_valid_url(uri: &str) -> bool {
    let lower = uri.to_ascii_lowercase();
    URL_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) && validator::validate_url(uri)
}
