// tests/router_tests.rs
//
// Router-level checks that never reach the database: the pool connects
// lazily and every request here is answered by middleware or a static
// handler.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use classroom::{
    config::Config, models::user::Role, routes, state::AppState, utils::jwt::sign_jwt,
};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

const SECRET: &str = "router_test_secret";

fn test_config(debug: bool) -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/classroom_unused".to_string()),
        "JWT_SECRET" => Some(SECRET.to_string()),
        "GEOIP_URL" => Some(String::new()),
        "APP_DEBUG" => Some(debug.to_string()),
        _ => None,
    })
    .unwrap()
}

fn app(debug: bool) -> Router {
    let config = test_config(debug);
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .unwrap();
    routes::create_router(AppState::new(pool, config))
}

fn token(role: Role) -> String {
    sign_jwt(1, "someone", role, SECRET, 600).unwrap()
}

#[tokio::test]
async fn anonymous_take_redirects_to_login() {
    let response = app(false)
        .oneshot(
            Request::builder()
                .uri("/api/students/quizzes/7/take")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(
        location,
        "/api/auth/login?next=%2Fapi%2Fstudents%2Fquizzes%2F7%2Ftake"
    );
}

#[tokio::test]
async fn login_redirect_keeps_the_full_path_and_query() {
    let response = app(false)
        .oneshot(
            Request::builder()
                .uri("/api/students/taken?page=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(
        location,
        "/api/auth/login?next=%2Fapi%2Fstudents%2Ftaken%3Fpage%3D2"
    );
}

#[tokio::test]
async fn anonymous_answer_submission_redirects_to_login() {
    let response = app(false)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/students/quizzes/7/take")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"answer": 1}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn teacher_routes_require_a_token() {
    let response = app(false)
        .oneshot(
            Request::builder()
                .uri("/api/teachers/quizzes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn students_cannot_use_teacher_routes() {
    let response = app(false)
        .oneshot(
            Request::builder()
                .uri("/api/teachers/quizzes")
                .header(header::AUTHORIZATION, format!("Bearer {}", token(Role::Student)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn teachers_cannot_take_quizzes() {
    let response = app(false)
        .oneshot(
            Request::builder()
                .uri("/api/students/quizzes/1/take")
                .header(header::AUTHORIZATION, format!("Bearer {}", token(Role::Teacher)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn logout_requires_a_token() {
    let response = app(false)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_index_is_hidden_in_strict_mode() {
    for uri in ["/api/", "/api-docs/openapi.json"] {
        let response = app(false)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn api_index_is_served_in_browsable_mode() {
    let response = app(true)
        .oneshot(Request::builder().uri("/api/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let index: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(index["quiz"], "/api/quiz/");
}

#[tokio::test]
async fn openapi_document_is_served_in_browsable_mode() {
    let response = app(true)
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(doc["paths"]["/api/teachers/quizzes/{id}/import"].is_object());
    assert!(doc["components"]["securitySchemes"]["jwt"].is_object());
}
