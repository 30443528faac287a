// src/models/audit.rs

use serde::Serialize;
use sqlx::FromRow;

/// Kinds of authentication events written to 'audit_entries'.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    LoggedIn,
    LoggedOut,
    LoginFailed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::LoggedIn => "user_logged_in",
            AuditAction::LoggedOut => "user_logged_out",
            AuditAction::LoginFailed => "user_login_failed",
        }
    }
}

/// Represents the 'audit_entries' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub action: String,
    pub username: Option<String>,
    /// Bare IP, or "<ip>, <city> <region> <country>" when located.
    pub ip: Option<String>,
    pub log_time: chrono::DateTime<chrono::Utc>,
}
