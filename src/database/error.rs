use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::Serialize;
use thiserror::Error;
use warp::reject::Reject;

/// Field-scoped validation messages. Every violation is collected instead of
/// short-circuiting on the first one, so the caller can render per-field
/// errors.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
            .collect::<Vec<String>>()
            .join("; ");
        write!(f, "{fields}")
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("authentication credentials were not provided or are invalid")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl Reject for ApiError {}

impl ApiError {
    pub fn reject(self) -> warp::Rejection {
        warp::reject::custom(self)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => match e.kind() {
                sqlx::error::ErrorKind::UniqueViolation => {
                    Self::BadRequest("the record already exists".to_string())
                }
                sqlx::error::ErrorKind::ForeignKeyViolation => {
                    Self::BadRequest("referenced record does not exist".to_string())
                }
                sqlx::error::ErrorKind::CheckViolation => {
                    Self::BadRequest("value out of allowed range".to_string())
                }
                _ => Self::Internal(format!("{e}")),
            },
            sqlx::Error::RowNotFound => Self::NotFound("no rows returned".to_string()),
            sqlx::Error::PoolTimedOut => Self::Internal("pool timed out".to_string()),
            sqlx::Error::PoolClosed => Self::Internal("pool closed".to_string()),
            other => Self::Internal(format!("{other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_collect_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("cooking_time", "cooking time must be at least 1 minute");
        errors.add("ingredients", "at least one ingredient is required");
        errors.add("ingredients", "ingredient 3 is listed more than once");

        assert!(errors.contains("cooking_time"));
        assert!(errors.contains("ingredients"));

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["ingredients"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn empty_errors_turn_into_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.add("tags", "at least one tag is required");
        assert!(matches!(
            errors.into_result(),
            Err(ApiError::Validation(_))
        ));
    }
}
