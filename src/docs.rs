// src/docs.rs

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    handlers::{api, auth, question, student, subject, teacher},
    models::{
        question::{
            Answer, AnswerInput, CreateQuestionRequest, PublicAnswer, PublicQuestion, Question,
            QuestionPreview, UpdateQuestionRequest,
        },
        quiz::{
            AvailableQuiz, CreateQuizRequest, QuestionSummary, Quiz, QuizDetail, QuizListing,
            TeacherQuizSummary, UpdateQuizRequest,
        },
        subject::{CreateSubjectRequest, Subject},
        taken_quiz::{QuizAttemptRow, QuizResults, TakenQuizEntry},
        user::{LoginRequest, LoginResponse, RegisterRequest, Role},
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::logout,
        subject::list_subjects,
        subject::create_subject,
        teacher::list_quizzes,
        teacher::create_quiz,
        teacher::get_quiz,
        teacher::update_quiz,
        teacher::delete_quiz,
        teacher::import_questions,
        teacher::quiz_results,
        teacher::bulk_add,
        question::add_question,
        question::preview_question,
        question::update_question,
        question::delete_question,
        student::list_available,
        student::list_taken,
        student::take_quiz,
        student::submit_answer,
        api::list_quizzes,
    ),
    components(schemas(
        Role,
        RegisterRequest,
        LoginRequest,
        LoginResponse,
        Subject,
        CreateSubjectRequest,
        Quiz,
        QuizListing,
        QuizDetail,
        QuestionSummary,
        TeacherQuizSummary,
        AvailableQuiz,
        CreateQuizRequest,
        UpdateQuizRequest,
        Question,
        Answer,
        PublicAnswer,
        PublicQuestion,
        QuestionPreview,
        CreateQuestionRequest,
        AnswerInput,
        UpdateQuestionRequest,
        TakenQuizEntry,
        QuizAttemptRow,
        QuizResults,
        teacher::ImportResponse,
        teacher::BulkAddResponse,
        student::AttemptState,
        student::Progress,
        student::SubmitAnswerRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Accounts and sessions"),
        (name = "Subjects", description = "Quiz subjects"),
        (name = "Teachers", description = "Owner-scoped quiz management"),
        (name = "Questions", description = "Questions and answer sets"),
        (name = "Students", description = "Taking quizzes"),
        (name = "Quizzes", description = "Public read-only listing")
    )
)]
pub struct ApiDoc;
