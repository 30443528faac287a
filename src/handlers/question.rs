// src/handlers/question.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::{
    config::{MAX_ANSWERS, MIN_ANSWERS},
    error::AppError,
    handlers::teacher::fetch_owned_quiz,
    models::question::{
        Answer, AnswerInput, CreateQuestionRequest, Question, QuestionPreview,
        UpdateQuestionRequest,
    },
    utils::jwt::Claims,
};

/// Bounds the editor enforces on the stored answer set.
fn check_answer_bounds(total: i64, correct: i64) -> Result<(), AppError> {
    if total < MIN_ANSWERS {
        return Err(AppError::BadRequest(format!(
            "Please submit at least {} answers.",
            MIN_ANSWERS
        )));
    }
    if total > MAX_ANSWERS {
        return Err(AppError::BadRequest(format!(
            "Please submit at most {} answers.",
            MAX_ANSWERS
        )));
    }
    if correct < 1 {
        return Err(AppError::BadRequest(
            "Mark at least one answer as correct.".to_string(),
        ));
    }
    Ok(())
}

async fn fetch_question(
    conn: &mut PgConnection,
    quiz_id: i64,
    question_id: i64,
) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, text, explanation FROM questions WHERE id = $1 AND quiz_id = $2",
    )
    .bind(question_id)
    .bind(quiz_id)
    .fetch_optional(conn)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))
}

/// Adds a question to an owned quiz. Answers are added with the editor.
#[utoipa::path(
    post,
    path = "/api/teachers/quizzes/{id}/questions",
    tag = "Questions",
    params(("id" = i64, Path, description = "Quiz id")),
    request_body = CreateQuestionRequest,
    responses(
        (status = 201, description = "Question created"),
        (status = 404, description = "Quiz not found or not owned")
    ),
    security(("jwt" = []))
)]
pub async fn add_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let quiz = fetch_owned_quiz(&pool, quiz_id, claims.user_id()?).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO questions (quiz_id, text, explanation) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(quiz.id)
    .bind(payload.text.trim())
    .bind(payload.explanation.as_deref().map(str::trim).unwrap_or(""))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": id,
            "message": "You may now add answers/options to the question."
        })),
    ))
}

/// The question with every answer and its correctness.
#[utoipa::path(
    get,
    path = "/api/teachers/quizzes/{quiz_id}/questions/{question_id}",
    tag = "Questions",
    params(
        ("quiz_id" = i64, Path, description = "Quiz id"),
        ("question_id" = i64, Path, description = "Question id")
    ),
    responses(
        (status = 200, description = "Question preview", body = QuestionPreview),
        (status = 404, description = "Not found or not owned")
    ),
    security(("jwt" = []))
)]
pub async fn preview_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_owned_quiz(&pool, quiz_id, claims.user_id()?).await?;

    let mut conn = pool.acquire().await?;
    let question = fetch_question(&mut conn, quiz.id, question_id).await?;

    let answers = sqlx::query_as::<_, Answer>(
        "SELECT id, question_id, text, is_correct FROM answers WHERE question_id = $1 ORDER BY id",
    )
    .bind(question.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Json(QuestionPreview { question, answers }))
}

async fn apply_answer(
    conn: &mut PgConnection,
    question_id: i64,
    input: &AnswerInput,
) -> Result<(), AppError> {
    let text = input.text.trim();

    let rows = match (input.id, input.delete) {
        (None, true) => return Ok(()),
        (None, false) => {
            sqlx::query("INSERT INTO answers (question_id, text, is_correct) VALUES ($1, $2, $3)")
                .bind(question_id)
                .bind(text)
                .bind(input.is_correct)
                .execute(&mut *conn)
                .await?
                .rows_affected()
        }
        (Some(id), true) => {
            sqlx::query("DELETE FROM answers WHERE id = $1 AND question_id = $2")
                .bind(id)
                .bind(question_id)
                .execute(&mut *conn)
                .await?
                .rows_affected()
        }
        (Some(id), false) => {
            sqlx::query(
                "UPDATE answers SET text = $1, is_correct = $2 WHERE id = $3 AND question_id = $4",
            )
            .bind(text)
            .bind(input.is_correct)
            .bind(id)
            .bind(question_id)
            .execute(&mut *conn)
            .await?
            .rows_affected()
        }
    };

    if rows == 0 {
        return Err(AppError::BadRequest(format!(
            "Answer {} does not belong to this question",
            input.id.unwrap_or_default()
        )));
    }

    Ok(())
}

/// Saves a question and its answer set together.
///
/// Everything runs in one transaction; if the resulting set breaks the
/// answer bounds nothing is kept.
#[utoipa::path(
    put,
    path = "/api/teachers/quizzes/{quiz_id}/questions/{question_id}",
    tag = "Questions",
    params(
        ("quiz_id" = i64, Path, description = "Quiz id"),
        ("question_id" = i64, Path, description = "Question id")
    ),
    request_body = UpdateQuestionRequest,
    responses(
        (status = 200, description = "Question and answers saved", body = QuestionPreview),
        (status = 400, description = "Invalid answer set"),
        (status = 404, description = "Not found or not owned")
    ),
    security(("jwt" = []))
)]
pub async fn update_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let owner_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    let quiz = fetch_owned_quiz(&mut *tx, quiz_id, owner_id).await?;
    let question = fetch_question(&mut tx, quiz.id, question_id).await?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        UPDATE questions SET text = $1, explanation = $2
        WHERE id = $3
        RETURNING id, quiz_id, text, explanation
        "#,
    )
    .bind(payload.text.trim())
    .bind(payload.explanation.as_deref().map(str::trim).unwrap_or(""))
    .bind(question.id)
    .fetch_one(&mut *tx)
    .await?;

    for input in &payload.answers {
        apply_answer(&mut tx, question.id, input).await?;
    }

    let (total, correct): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_correct) FROM answers WHERE question_id = $1",
    )
    .bind(question.id)
    .fetch_one(&mut *tx)
    .await?;

    // Dropping `tx` on error rolls the whole edit back.
    check_answer_bounds(total, correct)?;

    let answers = sqlx::query_as::<_, Answer>(
        "SELECT id, question_id, text, is_correct FROM answers WHERE question_id = $1 ORDER BY id",
    )
    .bind(question.id)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Question {} and {} answers saved", question.id, answers.len());

    Ok(Json(QuestionPreview { question, answers }))
}

/// Deletes a question of an owned quiz.
#[utoipa::path(
    delete,
    path = "/api/teachers/quizzes/{quiz_id}/questions/{question_id}",
    tag = "Questions",
    params(
        ("quiz_id" = i64, Path, description = "Quiz id"),
        ("question_id" = i64, Path, description = "Question id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not owned")
    ),
    security(("jwt" = []))
)]
pub async fn delete_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;

    let result = sqlx::query(
        r#"
        DELETE FROM questions q
        USING quizzes z
        WHERE q.id = $1 AND q.quiz_id = $2 AND z.id = q.quiz_id AND z.owner_id = $3
        "#,
    )
    .bind(question_id)
    .bind(quiz_id)
    .bind(owner_id)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to delete question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_accept_valid_sets() {
        assert!(check_answer_bounds(2, 1).is_ok());
        assert!(check_answer_bounds(10, 1).is_ok());
        assert!(check_answer_bounds(4, 2).is_ok());
    }

    #[test]
    fn test_too_few_answers() {
        assert!(matches!(
            check_answer_bounds(1, 1),
            Err(AppError::BadRequest(msg)) if msg.contains("at least 2")
        ));
        assert!(check_answer_bounds(0, 0).is_err());
    }

    #[test]
    fn test_too_many_answers() {
        assert!(matches!(
            check_answer_bounds(11, 1),
            Err(AppError::BadRequest(msg)) if msg.contains("at most 10")
        ));
    }

    #[test]
    fn test_needs_a_correct_answer() {
        assert!(matches!(
            check_answer_bounds(3, 0),
            Err(AppError::BadRequest(msg)) if msg.contains("correct")
        ));
    }
}
