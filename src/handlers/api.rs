// src/handlers/api.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use utoipa::OpenApi;

use crate::{docs::ApiDoc, error::AppError, models::quiz::QuizListing};

/// Read-only quiz listing; owner and subject are ids.
#[utoipa::path(
    get,
    path = "/api/quiz/",
    tag = "Quizzes",
    responses((status = 200, description = "All quizzes", body = [QuizListing]))
)]
pub async fn list_quizzes(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, QuizListing>(
        "SELECT id, owner_id AS owner, name, subject_id AS subject FROM quizzes ORDER BY id",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(quizzes))
}

/// Endpoint index, mounted in browsable mode only.
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "quiz": "/api/quiz/",
        "subjects": "/api/subjects",
        "auth": {
            "register": "/api/auth/register",
            "login": "/api/auth/login",
            "logout": "/api/auth/logout"
        },
        "teachers": {
            "quizzes": "/api/teachers/quizzes",
            "subjects": "/api/teachers/subjects",
            "bulk": "/api/teachers/quizzes/bulk"
        },
        "students": {
            "quizzes": "/api/students/quizzes",
            "taken": "/api/students/taken"
        },
        "openapi": "/api-docs/openapi.json"
    }))
}

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
