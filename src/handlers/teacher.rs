// src/handlers/teacher.rs
//
// Quiz management for the owning teacher. Every lookup filters on
// `owner_id`, so quizzes of other teachers behave as missing.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_foreign_key_violation},
    models::{
        quiz::{
            CreateQuizRequest, QuestionSummary, Quiz, QuizDetail, TeacherQuizSummary,
            UpdateQuizRequest,
        },
        taken_quiz::{QuizAttemptRow, QuizResults},
    },
    utils::{
        fixtures::collect_fixtures,
        html::clean_description,
        import::{insert_questions, parse_document},
        jwt::Claims,
    },
};

/// Loads a quiz only if `owner_id` owns it.
pub(crate) async fn fetch_owned_quiz<'e, E>(
    executor: E,
    quiz_id: i64,
    owner_id: i64,
) -> Result<Quiz, AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, owner_id, subject_id, name, description, created_at
        FROM quizzes
        WHERE id = $1 AND owner_id = $2
        "#,
    )
    .bind(quiz_id)
    .bind(owner_id)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

fn unknown_subject(e: sqlx::Error) -> AppError {
    if is_foreign_key_violation(&e) {
        AppError::BadRequest("Unknown subject".to_string())
    } else {
        tracing::error!("Failed to save quiz: {:?}", e);
        AppError::from(e)
    }
}

/// Lists the caller's quizzes with question and attempt counts.
#[utoipa::path(
    get,
    path = "/api/teachers/quizzes",
    tag = "Teachers",
    responses((status = 200, description = "Owned quizzes", body = [TeacherQuizSummary])),
    security(("jwt" = []))
)]
pub async fn list_quizzes(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;

    let quizzes = sqlx::query_as::<_, TeacherQuizSummary>(
        r#"
        SELECT
            q.id,
            q.name,
            q.subject_id,
            s.name AS subject_name,
            (SELECT COUNT(*) FROM questions WHERE quiz_id = q.id) AS questions_count,
            (SELECT COUNT(*) FROM taken_quizzes WHERE quiz_id = q.id) AS taken_count
        FROM quizzes q
        JOIN subjects s ON s.id = q.subject_id
        WHERE q.owner_id = $1
        ORDER BY q.name, q.id
        "#,
    )
    .bind(owner_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(quizzes))
}

/// Creates a quiz owned by the caller.
#[utoipa::path(
    post,
    path = "/api/teachers/quizzes",
    tag = "Teachers",
    request_body = CreateQuizRequest,
    responses(
        (status = 201, description = "Quiz created"),
        (status = 400, description = "Validation failed or unknown subject")
    ),
    security(("jwt" = []))
)]
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let owner_id = claims.user_id()?;

    let description = payload
        .description
        .as_deref()
        .map(clean_description)
        .unwrap_or_default();

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (owner_id, subject_id, name, description)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(owner_id)
    .bind(payload.subject_id)
    .bind(payload.name.trim())
    .bind(description)
    .fetch_one(&pool)
    .await
    .map_err(unknown_subject)?;

    tracing::info!("Teacher {} created quiz {}", owner_id, id);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": id,
            "message": "The quiz was created with success! Go ahead and add some questions now."
        })),
    ))
}

/// Quiz detail with its questions and their answer counts.
#[utoipa::path(
    get,
    path = "/api/teachers/quizzes/{id}",
    tag = "Teachers",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Quiz detail", body = QuizDetail),
        (status = 404, description = "Not found or not owned")
    ),
    security(("jwt" = []))
)]
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_owned_quiz(&pool, id, claims.user_id()?).await?;

    let questions = sqlx::query_as::<_, QuestionSummary>(
        r#"
        SELECT q.id, q.text, COUNT(a.id) AS answers_count
        FROM questions q
        LEFT JOIN answers a ON a.question_id = q.id
        WHERE q.quiz_id = $1
        GROUP BY q.id
        ORDER BY q.id
        "#,
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(QuizDetail { quiz, questions }))
}

/// Updates name, subject or description of an owned quiz.
#[utoipa::path(
    put,
    path = "/api/teachers/quizzes/{id}",
    tag = "Teachers",
    params(("id" = i64, Path, description = "Quiz id")),
    request_body = UpdateQuizRequest,
    responses(
        (status = 200, description = "Updated"),
        (status = 404, description = "Not found or not owned")
    ),
    security(("jwt" = []))
)]
pub async fn update_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let owner_id = claims.user_id()?;

    if payload.is_empty() {
        fetch_owned_quiz(&pool, id, owner_id).await?;
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE quizzes SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name.trim().to_string());
    }

    if let Some(subject_id) = payload.subject_id {
        separated.push("subject_id = ");
        separated.push_bind_unseparated(subject_id);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_description(&description));
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND owner_id = ");
    builder.push_bind(owner_id);

    let result = builder
        .build()
        .execute(&pool)
        .await
        .map_err(unknown_subject)?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes an owned quiz. Questions, answers and attempts go with it.
#[utoipa::path(
    delete,
    path = "/api/teachers/quizzes/{id}",
    tag = "Teachers",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not owned")
    ),
    security(("jwt" = []))
)]
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;

    let name: Option<String> =
        sqlx::query_scalar("DELETE FROM quizzes WHERE id = $1 AND owner_id = $2 RETURNING name")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete quiz: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

    match name {
        Some(name) => {
            tracing::info!("The quiz {} was deleted by teacher {}", name, owner_id);
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(AppError::NotFound("Quiz not found".to_string())),
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportResponse {
    pub imported: usize,
}

/// Imports questions from the line-delimited text format.
///
/// The document is parsed in full first; inserts share one transaction.
#[utoipa::path(
    post,
    path = "/api/teachers/quizzes/{id}/import",
    tag = "Teachers",
    params(("id" = i64, Path, description = "Quiz id")),
    request_body(content = String, content_type = "text/plain"),
    responses(
        (status = 200, description = "Questions imported", body = ImportResponse),
        (status = 400, description = "Malformed line"),
        (status = 404, description = "Not found or not owned")
    ),
    security(("jwt" = []))
)]
pub async fn import_questions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_owned_quiz(&pool, id, claims.user_id()?).await?;
    let questions = parse_document(&body)?;

    let mut tx = pool.begin().await?;
    let imported = insert_questions(&mut *tx, quiz.id, &questions)
        .await
        .map_err(|e| {
            tracing::error!("Failed to import questions into quiz {}: {:?}", quiz.id, e);
            AppError::InternalServerError(e.to_string())
        })?;
    tx.commit().await?;

    tracing::info!("Imported {} questions into quiz {}", imported, quiz.id);

    Ok(Json(ImportResponse { imported }))
}

/// Attempts, attempt count and average score of an owned quiz.
#[utoipa::path(
    get,
    path = "/api/teachers/quizzes/{id}/results",
    tag = "Teachers",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Quiz results", body = QuizResults),
        (status = 404, description = "Not found or not owned")
    ),
    security(("jwt" = []))
)]
pub async fn quiz_results(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_owned_quiz(&pool, id, claims.user_id()?).await?;

    let taken_quizzes = sqlx::query_as::<_, QuizAttemptRow>(
        r#"
        SELECT u.username, t.score, t.date
        FROM taken_quizzes t
        JOIN users u ON u.id = t.student_id
        WHERE t.quiz_id = $1
        ORDER BY t.date DESC, t.id DESC
        "#,
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    let (total_taken_quizzes, average_score): (i64, Option<f64>) =
        sqlx::query_as("SELECT COUNT(*), AVG(score) FROM taken_quizzes WHERE quiz_id = $1")
            .bind(quiz.id)
            .fetch_one(&pool)
            .await?;

    let total_questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
        .bind(quiz.id)
        .fetch_one(&pool)
        .await?;

    Ok(Json(QuizResults {
        quiz_id: quiz.id,
        quiz_name: quiz.name,
        taken_quizzes,
        total_taken_quizzes,
        average_score,
        total_questions,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkAddResponse {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
}

/// Loads every `<subject>/<quiz>.txt` under the fixtures directory.
///
/// Subjects are created on demand; a quiz that already exists under the
/// same name and subject is skipped. One transaction for the whole run.
#[utoipa::path(
    post,
    path = "/api/teachers/quizzes/bulk",
    tag = "Teachers",
    responses(
        (status = 200, description = "Files processed", body = BulkAddResponse),
        (status = 400, description = "A fixture file is malformed")
    ),
    security(("jwt" = []))
)]
pub async fn bulk_add(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;
    let root = config.quiz_fixtures_dir.clone();

    let fixtures = tokio::task::spawn_blocking(move || collect_fixtures(&root))
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .map_err(|e| {
            tracing::error!(
                "Failed to read fixtures from {}: {}",
                config.quiz_fixtures_dir.display(),
                e
            );
            AppError::InternalServerError(e.to_string())
        })?;

    let mut added = Vec::new();
    let mut skipped = Vec::new();
    let mut tx = pool.begin().await?;

    for fixture in fixtures {
        let filename = fixture.path.display().to_string();

        let subject_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO subjects (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(&fixture.subject)
        .fetch_one(&mut *tx)
        .await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM quizzes WHERE name = $1 AND subject_id = $2)",
        )
        .bind(&fixture.quiz_name)
        .bind(subject_id)
        .fetch_one(&mut *tx)
        .await?;

        if exists {
            skipped.push(filename);
            continue;
        }

        let questions = parse_document(&fixture.contents)
            .map_err(|e| AppError::BadRequest(format!("{}: {}", filename, e)))?;

        let quiz_id: i64 = sqlx::query_scalar(
            "INSERT INTO quizzes (owner_id, subject_id, name) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(owner_id)
        .bind(subject_id)
        .bind(&fixture.quiz_name)
        .fetch_one(&mut *tx)
        .await?;

        tracing::info!("Processing file: {}", filename);
        insert_questions(&mut *tx, quiz_id, &questions).await?;
        added.push(filename);
    }

    tx.commit().await?;

    Ok(Json(BulkAddResponse { added, skipped }))
}
