// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Quiz {
    pub id: i64,
    pub owner_id: i64,
    pub subject_id: i64,
    pub name: String,
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Read-only listing row: owner and subject are ids.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct QuizListing {
    pub id: i64,
    pub owner: i64,
    pub name: String,
    pub subject: i64,
}

/// A row of the owner's quiz list.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TeacherQuizSummary {
    pub id: i64,
    pub name: String,
    pub subject_id: i64,
    pub subject_name: String,
    pub questions_count: i64,
    pub taken_count: i64,
}

/// A quiz a student can still take.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct AvailableQuiz {
    pub id: i64,
    pub name: String,
    pub subject_name: String,
    pub subject_color: String,
    pub questions_count: i64,
}

/// Question row inside the quiz detail view.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct QuestionSummary {
    pub id: i64,
    pub text: String,
    pub answers_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionSummary>,
}

/// DTO for creating a quiz.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub subject_id: i64,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub subject_id: Option<i64>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

impl UpdateQuizRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.subject_id.is_none() && self.description.is_none()
    }
}
