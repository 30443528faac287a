// src/handlers/student.rs
//
// Quiz attempts. Progress is not stored separately: the current question is
// always the lowest-id question of the quiz without a `student_answers` row
// for the caller. The attempt record is written once, with the last answer.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use utoipa::ToSchema;

use crate::{
    config::PASSING_SCORE_PERCENTAGE,
    error::{AppError, is_unique_violation},
    models::{
        question::{PublicAnswer, PublicQuestion},
        quiz::AvailableQuiz,
        taken_quiz::TakenQuizEntry,
    },
    utils::jwt::Claims,
};

/// Percentage of correct answers, rounded to two decimals.
fn calculate_score(correct_count: i64, total_questions: i64) -> f64 {
    if total_questions <= 0 {
        return 0.0;
    }
    let score = (correct_count as f64 / total_questions as f64) * 100.0;
    (score * 100.0).round() / 100.0
}

/// Prints a score with at least one decimal: `100.0`, `50.0`, `66.67`.
fn display_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{:.1}", score)
    } else {
        format!("{}", score)
    }
}

fn completion_message(quiz_name: &str, score: f64) -> String {
    if score < PASSING_SCORE_PERCENTAGE {
        format!(
            "Better luck next time! Your score for the quiz {} was {}.",
            quiz_name,
            display_score(score)
        )
    } else {
        format!(
            "Congratulations! You completed the quiz {} with success! You scored {} points.",
            quiz_name,
            display_score(score)
        )
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Progress {
    pub answered: i64,
    pub total: i64,
    pub percent: i64,
}

impl Progress {
    fn new(answered: i64, total: i64) -> Self {
        let percent = if total > 0 { answered * 100 / total } else { 0 };
        Self {
            answered,
            total,
            percent,
        }
    }
}

/// Where the caller stands in a quiz.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptState {
    InProgress {
        quiz_id: i64,
        quiz_name: String,
        question: PublicQuestion,
        progress: Progress,
    },
    Completed {
        quiz_id: i64,
        quiz_name: String,
        score: f64,
        message: String,
    },
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    /// Id of the chosen answer of the current question.
    pub answer: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct QuizHeader {
    id: i64,
    name: String,
}

#[derive(sqlx::FromRow)]
struct CurrentQuestion {
    id: i64,
    text: String,
}

async fn fetch_quiz(conn: &mut PgConnection, quiz_id: i64) -> Result<QuizHeader, AppError> {
    sqlx::query_as::<_, QuizHeader>("SELECT id, name FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .fetch_optional(conn)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

async fn ensure_not_taken(
    conn: &mut PgConnection,
    student_id: i64,
    quiz: &QuizHeader,
) -> Result<(), AppError> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM taken_quizzes WHERE student_id = $1 AND quiz_id = $2)",
    )
    .bind(student_id)
    .bind(quiz.id)
    .fetch_one(conn)
    .await?;

    if taken {
        return Err(AppError::Conflict(format!(
            "You have already completed the quiz {}",
            quiz.name
        )));
    }
    Ok(())
}

async fn count_questions(conn: &mut PgConnection, quiz_id: i64) -> Result<i64, AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
        .bind(quiz_id)
        .fetch_one(conn)
        .await?;
    Ok(total)
}

async fn next_unanswered(
    conn: &mut PgConnection,
    student_id: i64,
    quiz_id: i64,
) -> Result<Option<CurrentQuestion>, AppError> {
    let question = sqlx::query_as::<_, CurrentQuestion>(
        r#"
        SELECT q.id, q.text
        FROM questions q
        WHERE q.quiz_id = $1
          AND NOT EXISTS (
              SELECT 1 FROM student_answers sa
              WHERE sa.question_id = q.id AND sa.student_id = $2
          )
        ORDER BY q.id
        LIMIT 1
        "#,
    )
    .bind(quiz_id)
    .bind(student_id)
    .fetch_optional(conn)
    .await?;
    Ok(question)
}

/// Builds the in-progress state, or `None` when every question is answered.
async fn present_next(
    conn: &mut PgConnection,
    student_id: i64,
    quiz: &QuizHeader,
    total: i64,
) -> Result<Option<AttemptState>, AppError> {
    let Some(current) = next_unanswered(&mut *conn, student_id, quiz.id).await? else {
        return Ok(None);
    };

    let answers = sqlx::query_as::<_, PublicAnswer>(
        "SELECT id, text FROM answers WHERE question_id = $1 ORDER BY id",
    )
    .bind(current.id)
    .fetch_all(&mut *conn)
    .await?;

    let answered: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM student_answers sa
        JOIN questions q ON q.id = sa.question_id
        WHERE q.quiz_id = $1 AND sa.student_id = $2
        "#,
    )
    .bind(quiz.id)
    .bind(student_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Some(AttemptState::InProgress {
        quiz_id: quiz.id,
        quiz_name: quiz.name.clone(),
        question: PublicQuestion {
            id: current.id,
            text: current.text,
            answers,
        },
        progress: Progress::new(answered, total),
    }))
}

/// Scores the run and writes the attempt record.
async fn complete_attempt(
    conn: &mut PgConnection,
    student_id: i64,
    quiz: &QuizHeader,
    total: i64,
) -> Result<AttemptState, AppError> {
    let correct: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM student_answers sa
        JOIN answers a ON a.id = sa.answer_id
        JOIN questions q ON q.id = sa.question_id
        WHERE q.quiz_id = $1 AND sa.student_id = $2 AND a.is_correct
        "#,
    )
    .bind(quiz.id)
    .bind(student_id)
    .fetch_one(&mut *conn)
    .await?;

    let score = calculate_score(correct, total);

    sqlx::query("INSERT INTO taken_quizzes (student_id, quiz_id, score) VALUES ($1, $2, $3)")
        .bind(student_id)
        .bind(quiz.id)
        .bind(score)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("You have already completed the quiz {}", quiz.name))
            } else {
                tracing::error!("Failed to save attempt record: {:?}", e);
                AppError::from(e)
            }
        })?;

    tracing::info!(
        "Student {} completed quiz {} with score {}",
        student_id,
        quiz.id,
        score
    );

    Ok(AttemptState::Completed {
        quiz_id: quiz.id,
        quiz_name: quiz.name.clone(),
        score,
        message: completion_message(&quiz.name, score),
    })
}

/// Shows the caller's current question of a quiz.
#[utoipa::path(
    get,
    path = "/api/students/quizzes/{id}/take",
    tag = "Students",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Current attempt state", body = AttemptState),
        (status = 302, description = "Not logged in; redirected to login"),
        (status = 404, description = "Quiz not found"),
        (status = 409, description = "Quiz already completed")
    ),
    security(("jwt" = []))
)]
pub async fn take_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let mut tx = pool.begin().await?;

    let quiz = fetch_quiz(&mut tx, quiz_id).await?;
    ensure_not_taken(&mut tx, student_id, &quiz).await?;

    let total = count_questions(&mut tx, quiz.id).await?;
    if total == 0 {
        return Err(AppError::BadRequest(
            "This quiz has no questions yet".to_string(),
        ));
    }

    let state = match present_next(&mut tx, student_id, &quiz, total).await? {
        Some(state) => state,
        // Every question answered but no record yet: finish the run now.
        None => complete_attempt(&mut tx, student_id, &quiz, total).await?,
    };

    tx.commit().await?;
    Ok(Json(state))
}

/// Records the answer to the current question and moves on.
///
/// The last answer completes the quiz, scores it and writes the attempt
/// record in the same transaction.
#[utoipa::path(
    post,
    path = "/api/students/quizzes/{id}/take",
    tag = "Students",
    params(("id" = i64, Path, description = "Quiz id")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Next question or completion", body = AttemptState),
        (status = 400, description = "No answer selected or answer not on the current question"),
        (status = 302, description = "Not logged in; redirected to login"),
        (status = 409, description = "Quiz already completed")
    ),
    security(("jwt" = []))
)]
pub async fn submit_answer(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let answer_id = payload
        .answer
        .ok_or_else(|| AppError::BadRequest("Please select an answer.".to_string()))?;
    let student_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    let quiz = fetch_quiz(&mut tx, quiz_id).await?;
    ensure_not_taken(&mut tx, student_id, &quiz).await?;

    let total = count_questions(&mut tx, quiz.id).await?;
    if total == 0 {
        return Err(AppError::BadRequest(
            "This quiz has no questions yet".to_string(),
        ));
    }

    let current = next_unanswered(&mut tx, student_id, quiz.id)
        .await?
        .ok_or_else(|| AppError::Conflict("This quiz has no unanswered questions".to_string()))?;

    let belongs: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM answers WHERE id = $1 AND question_id = $2)",
    )
    .bind(answer_id)
    .bind(current.id)
    .fetch_one(&mut *tx)
    .await?;

    if !belongs {
        return Err(AppError::BadRequest(
            "The selected answer does not belong to the current question".to_string(),
        ));
    }

    sqlx::query(
        "INSERT INTO student_answers (student_id, question_id, answer_id) VALUES ($1, $2, $3)",
    )
    .bind(student_id)
    .bind(current.id)
    .bind(answer_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("This question was already answered".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    let state = match present_next(&mut tx, student_id, &quiz, total).await? {
        Some(state) => state,
        None => complete_attempt(&mut tx, student_id, &quiz, total).await?,
    };

    tx.commit().await?;
    Ok(Json(state))
}

/// Quizzes with questions that the caller has not taken yet.
#[utoipa::path(
    get,
    path = "/api/students/quizzes",
    tag = "Students",
    responses((status = 200, description = "Quizzes available to take", body = [AvailableQuiz])),
    security(("jwt" = []))
)]
pub async fn list_available(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let quizzes = sqlx::query_as::<_, AvailableQuiz>(
        r#"
        SELECT
            z.id,
            z.name,
            s.name AS subject_name,
            s.color AS subject_color,
            COUNT(q.id) AS questions_count
        FROM quizzes z
        JOIN subjects s ON s.id = z.subject_id
        JOIN questions q ON q.quiz_id = z.id
        WHERE NOT EXISTS (
            SELECT 1 FROM taken_quizzes t WHERE t.quiz_id = z.id AND t.student_id = $1
        )
        GROUP BY z.id, s.name, s.color
        ORDER BY z.name, z.id
        "#,
    )
    .bind(student_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(quizzes))
}

/// The caller's completed quizzes, newest first.
#[utoipa::path(
    get,
    path = "/api/students/taken",
    tag = "Students",
    responses((status = 200, description = "Completed quizzes", body = [TakenQuizEntry])),
    security(("jwt" = []))
)]
pub async fn list_taken(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let taken = sqlx::query_as::<_, TakenQuizEntry>(
        r#"
        SELECT t.quiz_id, z.name AS quiz_name, s.name AS subject_name, t.score, t.date
        FROM taken_quizzes t
        JOIN quizzes z ON z.id = t.quiz_id
        JOIN subjects s ON s.id = z.subject_id
        WHERE t.student_id = $1
        ORDER BY t.date DESC, t.id DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(taken))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_score_perfect() {
        assert_eq!(calculate_score(1, 1), 100.0);
        assert_eq!(calculate_score(5, 5), 100.0);
    }

    #[test]
    fn test_calculate_score_half() {
        assert_eq!(calculate_score(1, 2), 50.0);
    }

    #[test]
    fn test_calculate_score_rounds_to_two_decimals() {
        assert_eq!(calculate_score(2, 3), 66.67);
        assert_eq!(calculate_score(1, 3), 33.33);
    }

    #[test]
    fn test_calculate_score_zero() {
        assert_eq!(calculate_score(0, 4), 0.0);
        assert_eq!(calculate_score(0, 0), 0.0);
    }

    #[test]
    fn test_display_score() {
        assert_eq!(display_score(100.0), "100.0");
        assert_eq!(display_score(50.0), "50.0");
        assert_eq!(display_score(66.67), "66.67");
        assert_eq!(display_score(0.0), "0.0");
    }

    #[test]
    fn test_completion_message_success() {
        assert_eq!(
            completion_message("Attempt Quiz", 100.0),
            "Congratulations! You completed the quiz Attempt Quiz with success! You scored 100.0 points."
        );
        assert!(completion_message("Q", 50.0).starts_with("Congratulations!"));
    }

    #[test]
    fn test_completion_message_below_pass() {
        assert_eq!(
            completion_message("Algebra", 33.33),
            "Better luck next time! Your score for the quiz Algebra was 33.33."
        );
    }

    #[test]
    fn test_progress_percent() {
        let p = Progress::new(1, 3);
        assert_eq!(p.percent, 33);
        assert_eq!(Progress::new(0, 0).percent, 0);
    }

    #[test]
    fn test_attempt_state_is_tagged() {
        let state = AttemptState::Completed {
            quiz_id: 1,
            quiz_name: "Q".into(),
            score: 100.0,
            message: "done".into(),
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["score"], 100.0);
    }
}
