use crate::{config::Config, utils::audit::AuditLogger};
use axum::extract::FromRef;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub audit: AuditLogger,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let audit = AuditLogger::from_config(&config);
        Self {
            pool,
            config,
            audit,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for AuditLogger {
    fn from_ref(state: &AppState) -> Self {
        state.audit.clone()
    }
}
