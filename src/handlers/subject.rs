// src/handlers/subject.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::subject::{CreateSubjectRequest, Subject},
};

const DEFAULT_SUBJECT_COLOR: &str = "#007bff";

/// Lists all subjects by name.
#[utoipa::path(
    get,
    path = "/api/subjects",
    tag = "Subjects",
    responses((status = 200, description = "All subjects", body = [Subject]))
)]
pub async fn list_subjects(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let subjects =
        sqlx::query_as::<_, Subject>("SELECT id, name, color FROM subjects ORDER BY name")
            .fetch_all(&pool)
            .await?;

    Ok(Json(subjects))
}

/// Creates a subject.
/// Teacher only.
#[utoipa::path(
    post,
    path = "/api/teachers/subjects",
    tag = "Subjects",
    request_body = CreateSubjectRequest,
    responses(
        (status = 201, description = "Subject created", body = Subject),
        (status = 409, description = "Name taken")
    ),
    security(("jwt" = []))
)]
pub async fn create_subject(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let name = payload.name.trim();
    let color = payload.color.as_deref().unwrap_or(DEFAULT_SUBJECT_COLOR);

    let subject = sqlx::query_as::<_, Subject>(
        "INSERT INTO subjects (name, color) VALUES ($1, $2) RETURNING id, name, color",
    )
    .bind(name)
    .bind(color)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Subject '{}' already exists", name))
        } else {
            tracing::error!("Failed to create subject: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(subject)))
}
