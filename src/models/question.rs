// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// The text content of the question.
    pub text: String,

    /// Shown to the student after answering. Empty when there is none.
    pub explanation: String,
}

/// Represents the 'answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// DTO for sending an answer option to a student (excludes correctness).
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct PublicAnswer {
    pub id: i64,
    pub text: String,
}

/// DTO for sending the current question to a student.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub answers: Vec<PublicAnswer>,
}

/// Owner preview: the question together with its full answer set.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionPreview {
    #[serde(flatten)]
    pub question: Question,
    pub answers: Vec<Answer>,
}

/// DTO for adding a question to a quiz.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 255))]
    pub text: String,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
}

/// One entry of the answer-set editor.
///
/// Without `id` the entry is a new answer; with `id` it edits (or, with
/// `delete`, removes) an existing answer of the same question.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AnswerInput {
    pub id: Option<i64>,
    #[validate(length(min = 1, max = 255))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub delete: bool,
}

/// DTO for saving a question and its answers together.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 255))]
    pub text: String,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[validate(nested)]
    pub answers: Vec<AnswerInput>,
}
