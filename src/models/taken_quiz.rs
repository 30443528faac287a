// src/models/taken_quiz.rs

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Represents the 'taken_quizzes' table in the database.
/// One row per completed attempt; never updated.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct TakenQuiz {
    pub id: i64,
    pub student_id: i64,
    pub quiz_id: i64,
    pub score: f64,
    pub date: chrono::DateTime<chrono::Utc>,
}

/// A student's own attempt, joined with the quiz.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TakenQuizEntry {
    pub quiz_id: i64,
    pub quiz_name: String,
    pub subject_name: String,
    pub score: f64,
    pub date: chrono::DateTime<chrono::Utc>,
}

/// An attempt as seen by the quiz owner.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct QuizAttemptRow {
    pub username: String,
    pub score: f64,
    pub date: chrono::DateTime<chrono::Utc>,
}

/// Aggregated results for one quiz.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuizResults {
    pub quiz_id: i64,
    pub quiz_name: String,
    pub taken_quizzes: Vec<QuizAttemptRow>,
    pub total_taken_quizzes: i64,
    pub average_score: Option<f64>,
    pub total_questions: i64,
}
