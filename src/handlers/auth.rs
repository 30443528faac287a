// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{LoginRequest, LoginResponse, RegisterRequest, Role, User},
    utils::{
        audit::AuditLogger,
        client_ip::ClientIp,
        hash::{hash_password, verify_against_dummy, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

/// Registers a new teacher or student account.
///
/// Student accounts get their `students` row in the same transaction.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password, role)
        VALUES ($1, $2, $3)
        RETURNING id, username, password, role, created_at
        "#,
    )
    .bind(&payload.username)
    .bind(&hashed_password)
    .bind(payload.role.as_str())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    if payload.role == Role::Student {
        sqlx::query("INSERT INTO students (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!("Registered {} account '{}'", user.role, user.username);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
///
/// Successful and failed attempts are both written to the audit log.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(audit): State<AuditLogger>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role, created_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let is_valid = match &user {
        Some(user) => verify_password(&payload.password, &user.password)?,
        None => verify_against_dummy(&payload.password),
    };

    let user = match user {
        Some(user) if is_valid => user,
        _ => {
            audit.login_failed(&pool, &payload.username).await;
            return Err(AppError::AuthError(
                "Please enter a correct username and password.".to_string(),
            ));
        }
    };

    let role: Role = user
        .role
        .parse()
        .map_err(AppError::InternalServerError)?;

    let token = sign_jwt(
        user.id,
        &user.username,
        role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    audit.logged_in(&pool, &user.username, ip).await;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        role,
    }))
}

/// Records a logout. Tokens are stateless; the client discards its own.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Not authenticated")
    ),
    security(("jwt" = []))
)]
pub async fn logout(
    State(pool): State<PgPool>,
    State(audit): State<AuditLogger>,
    ClientIp(ip): ClientIp,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    audit.logged_out(&pool, &claims.username, ip).await;

    Ok(Json(json!({ "message": "Logged out" })))
}
