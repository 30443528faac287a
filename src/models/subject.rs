// src/models/subject.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Represents the 'subjects' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    /// Badge color, `#rrggbb`.
    pub color: String,
}

/// DTO for creating a subject.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, max = 30))]
    pub name: String,
    #[validate(custom(function = validate_color))]
    pub color: Option<String>,
}

fn validate_color(color: &str) -> Result<(), validator::ValidationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(validator::ValidationError::new("invalid_color"));
    }
    Ok(())
}
