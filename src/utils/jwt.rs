// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError, models::user::Role};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    pub username: String,
    /// User's role ('teacher' or 'student').
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }

    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}

/// Signs a new JWT for the user.
pub fn sign_jwt(
    id: i64,
    username: &str,
    role: Role,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(),
        username: username.to_owned(),
        role: role.as_str().to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and injects `Claims`
/// into the request extensions. Missing or invalid tokens get 401.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;

    let claims = verify_jwt(token, &config.jwt_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Axum Middleware: Login required.
///
/// Like `auth_middleware`, but anonymous callers are sent to the login URL
/// with a `next` parameter instead of receiving 401.
pub async fn login_required(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let claims = bearer_token(req.headers()).and_then(|t| verify_jwt(t, &config.jwt_secret).ok());

    match claims {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        None => {
            // Nested routers see a stripped URI; `OriginalUri` keeps the full path.
            let uri = req
                .extensions()
                .get::<OriginalUri>()
                .map(|OriginalUri(uri)| uri)
                .unwrap_or_else(|| req.uri());
            let next_path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
            login_redirect(&config.login_url, next_path)
        }
    }
}

/// `302 Found` to the login page, remembering where the caller was going.
pub fn login_redirect(login_url: &str, next_path: &str) -> Response {
    let encoded: String = url::form_urlencoded::byte_serialize(next_path.as_bytes()).collect();
    let separator = if login_url.contains('?') { '&' } else { '?' };
    let location = format!("{}{}next={}", login_url, separator, encoded);

    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

async fn require_role(role: Role, req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::AuthError("Not authenticated".to_string()))?;

    if claims.role() != Some(role) {
        return Err(AppError::Forbidden(format!(
            "This action requires a {} account",
            role.as_str()
        )));
    }

    Ok(next.run(req).await)
}

/// Axum Middleware: Teacher Authorization.
///
/// Must be used AFTER an authentication middleware.
pub async fn teacher_only(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_role(Role::Teacher, req, next).await
}

/// Axum Middleware: Student Authorization.
///
/// Must be used AFTER an authentication middleware.
pub async fn student_only(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_role(Role::Student, req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let token = sign_jwt(42, "alice", Role::Teacher, "secret", 600).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();

        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role(), Some(Role::Teacher));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = sign_jwt(1, "bob", Role::Student, "secret", 600).unwrap();
        assert!(matches!(
            verify_jwt(&token, "other"),
            Err(AppError::AuthError(_))
        ));
    }

    #[test]
    fn test_login_redirect_encodes_next() {
        let resp = login_redirect("/api/auth/login", "/api/students/quizzes/7/take");
        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp.headers()[header::LOCATION].to_str().unwrap();
        assert_eq!(
            location,
            "/api/auth/login?next=%2Fapi%2Fstudents%2Fquizzes%2F7%2Ftake"
        );
    }

    #[test]
    fn test_login_redirect_appends_to_existing_query() {
        let resp = login_redirect("/login?lang=en", "/x");
        let location = resp.headers()[header::LOCATION].to_str().unwrap();
        assert_eq!(location, "/login?lang=en&next=%2Fx");
    }
}
