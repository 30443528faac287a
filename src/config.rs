// src/config.rs

use std::{env, fmt, net::SocketAddr, path::PathBuf, time::Duration};

use url::Url;

/// An editable question must keep between these many answers.
pub const MIN_ANSWERS: i64 = 2;
pub const MAX_ANSWERS: i64 = 10;

/// Scores below this percentage get the "better luck next time" message.
pub const PASSING_SCORE_PERCENTAGE: f64 = 50.0;

/// Which extra API surfaces are mounted.
///
/// `Browsable` adds the endpoint index at `/api/` and the OpenAPI document;
/// `Strict` only serves the application routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMode {
    Strict,
    Browsable,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub log_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub api_mode: ApiMode,
    pub login_url: String,
    /// Base URL of the ipinfo-compatible lookup. `None` disables geolocation.
    pub geoip_url: Option<Url>,
    pub geoip_timeout: Duration,
    pub trust_proxy_headers: bool,
    pub quiz_fixtures_dir: PathBuf,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "invalid value for {}: '{}'", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration = match lookup("JWT_EXPIRATION") {
            Some(v) => v.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "JWT_EXPIRATION",
                value: v.clone(),
            })?,
            None => 86_400,
        };

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());
        let log_dir = PathBuf::from(lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()));

        let bind_addr = match lookup("BIND_ADDR") {
            Some(v) => v.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: v.clone(),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let api_mode = if parse_bool("APP_DEBUG", lookup("APP_DEBUG"))? {
            ApiMode::Browsable
        } else {
            ApiMode::Strict
        };

        let login_url = lookup("LOGIN_URL").unwrap_or_else(|| "/api/auth/login".to_string());

        let geoip_url = match lookup("GEOIP_URL") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(Url::parse(&v).map_err(|_| ConfigError::Invalid {
                key: "GEOIP_URL",
                value: v.clone(),
            })?),
            None => Some(Url::parse("https://ipinfo.io").map_err(|_| ConfigError::Invalid {
                key: "GEOIP_URL",
                value: "https://ipinfo.io".to_string(),
            })?),
        };

        let geoip_timeout = match lookup("GEOIP_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(v.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "GEOIP_TIMEOUT_MS",
                value: v.clone(),
            })?),
            None => Duration::from_millis(1500),
        };

        let trust_proxy_headers = parse_bool("TRUST_PROXY_HEADERS", lookup("TRUST_PROXY_HEADERS"))?;

        let quiz_fixtures_dir = PathBuf::from(
            lookup("QUIZ_FIXTURES_DIR").unwrap_or_else(|| "fixtures/quizzes".to_string()),
        );

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            log_dir,
            bind_addr,
            api_mode,
            login_url,
            geoip_url,
            geoip_timeout,
            trust_proxy_headers,
            quiz_fixtures_dir,
            cors_origins,
        })
    }
}

fn parse_bool(key: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value: v.to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/classroom"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.jwt_expiration, 86_400);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.api_mode, ApiMode::Strict);
        assert_eq!(config.login_url, "/api/auth/login");
        assert_eq!(config.geoip_url.unwrap().as_str(), "https://ipinfo.io/");
        assert_eq!(config.bind_addr.port(), 3000);
        assert!(!config.trust_proxy_headers);
    }

    #[test]
    fn test_missing_required() {
        let err = Config::from_lookup(lookup_from(&[("JWT_SECRET", "secret")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_debug_selects_browsable_api() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/classroom"),
            ("JWT_SECRET", "secret"),
            ("APP_DEBUG", "true"),
        ]))
        .unwrap();
        assert_eq!(config.api_mode, ApiMode::Browsable);
    }

    #[test]
    fn test_empty_geoip_disables_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/classroom"),
            ("JWT_SECRET", "secret"),
            ("GEOIP_URL", ""),
        ]))
        .unwrap();
        assert!(config.geoip_url.is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/classroom"),
            ("JWT_SECRET", "secret"),
            ("APP_DEBUG", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "APP_DEBUG", .. }));

        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/classroom"),
            ("JWT_SECRET", "secret"),
            ("JWT_EXPIRATION", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "JWT_EXPIRATION", .. }));
    }
}
