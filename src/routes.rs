// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::ApiMode,
    handlers::{api, auth, question, student, subject, teacher},
    state::AppState,
    utils::jwt::{auth_middleware, login_required, student_only, teacher_only},
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// Assembles the main application router.
///
/// * Teacher routes: bearer token (401) then role check (403).
/// * Student routes: login redirect (302) then role check (403).
/// * `/api/` and the OpenAPI document exist only in browsable mode.
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let teacher_routes = Router::new()
        .route("/subjects", post(subject::create_subject))
        .route(
            "/quizzes",
            get(teacher::list_quizzes).post(teacher::create_quiz),
        )
        .route("/quizzes/bulk", post(teacher::bulk_add))
        .route(
            "/quizzes/{id}",
            get(teacher::get_quiz)
                .put(teacher::update_quiz)
                .delete(teacher::delete_quiz),
        )
        .route("/quizzes/{id}/import", post(teacher::import_questions))
        .route("/quizzes/{id}/results", get(teacher::quiz_results))
        .route("/quizzes/{id}/questions", post(question::add_question))
        .route(
            "/quizzes/{quiz_id}/questions/{question_id}",
            get(question::preview_question)
                .put(question::update_question)
                .delete(question::delete_question),
        )
        .route_layer(middleware::from_fn(teacher_only))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let student_routes = Router::new()
        .route("/quizzes", get(student::list_available))
        .route("/taken", get(student::list_taken))
        .route(
            "/quizzes/{id}/take",
            get(student::take_quiz).post(student::submit_answer),
        )
        .route_layer(middleware::from_fn(student_only))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login_required,
        ));

    let mut router = Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/teachers", teacher_routes)
        .nest("/api/students", student_routes)
        .route("/api/subjects", get(subject::list_subjects))
        .route("/api/quiz", get(api::list_quizzes))
        .route("/api/quiz/", get(api::list_quizzes));

    if state.config.api_mode == ApiMode::Browsable {
        tracing::info!("Browsable API enabled at /api/");
        router = router
            .route("/api/", get(api::api_root))
            .route("/api-docs/openapi.json", get(api::openapi_json));
    }

    let cors = cors_layer(&state.config.cors_origins);

    router
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
