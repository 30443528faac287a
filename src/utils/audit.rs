// src/utils/audit.rs

use std::{fmt, net::IpAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;
use url::Url;

use crate::{config::Config, models::audit::AuditAction};

/// Where an IP address appears to be.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub city: String,
    pub region: String,
    pub country: String,
}

#[derive(Debug)]
pub enum GeoError {
    Http(reqwest::Error),
    BadBaseUrl(String),
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoError::Http(e) => write!(f, "geolocation request failed: {}", e),
            GeoError::BadBaseUrl(url) => write!(f, "geolocation URL cannot take a path: {}", url),
        }
    }
}

impl std::error::Error for GeoError {}

impl From<reqwest::Error> for GeoError {
    fn from(err: reqwest::Error) -> Self {
        GeoError::Http(err)
    }
}

#[async_trait]
pub trait GeoLocator: Send + Sync {
    async fn locate(&self, ip: IpAddr) -> Result<Location, GeoError>;
}

/// Looks addresses up with an ipinfo.io-compatible `GET /<ip>/json`.
pub struct IpInfoLocator {
    base_url: Url,
    client: reqwest::Client,
}

impl IpInfoLocator {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    fn lookup_url(&self, ip: IpAddr) -> Result<Url, GeoError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GeoError::BadBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(&ip.to_string())
            .push("json");
        Ok(url)
    }
}

#[async_trait]
impl GeoLocator for IpInfoLocator {
    async fn locate(&self, ip: IpAddr) -> Result<Location, GeoError> {
        let url = self.lookup_url(ip)?;
        let location = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Location>()
            .await?;
        Ok(location)
    }
}

pub fn format_location(ip: IpAddr, location: &Location) -> String {
    format!(
        "{}, {} {} {}",
        ip, location.city, location.region, location.country
    )
}

/// Writes authentication events to 'audit_entries'.
///
/// Geolocation is best-effort and a failed insert is only logged: auditing
/// never fails the request it describes.
#[derive(Clone, Default)]
pub struct AuditLogger {
    locator: Option<Arc<dyn GeoLocator>>,
}

impl AuditLogger {
    pub fn new(locator: Option<Arc<dyn GeoLocator>>) -> Self {
        Self { locator }
    }

    pub fn from_config(config: &Config) -> Self {
        let locator = config.geoip_url.clone().and_then(|url| {
            match IpInfoLocator::new(url, config.geoip_timeout) {
                Ok(locator) => Some(Arc::new(locator) as Arc<dyn GeoLocator>),
                Err(e) => {
                    tracing::warn!("Geolocation disabled: {}", e);
                    None
                }
            }
        });
        Self::new(locator)
    }

    /// The IP with its location appended when the lookup succeeds.
    pub async fn describe_ip(&self, ip: Option<IpAddr>) -> Option<String> {
        let ip = ip?;

        let locator = match &self.locator {
            Some(locator) if !ip.is_loopback() && !ip.is_unspecified() => locator,
            _ => return Some(ip.to_string()),
        };

        match locator.locate(ip).await {
            Ok(location) => Some(format_location(ip, &location)),
            Err(e) => {
                tracing::debug!("Geolocation lookup for {} failed: {}", ip, e);
                Some(ip.to_string())
            }
        }
    }

    pub async fn logged_in(&self, pool: &PgPool, username: &str, ip: Option<IpAddr>) {
        let ip = self.describe_ip(ip).await;
        self.record(pool, AuditAction::LoggedIn, Some(username), ip).await;
    }

    pub async fn logged_out(&self, pool: &PgPool, username: &str, ip: Option<IpAddr>) {
        let ip = ip.map(|ip| ip.to_string());
        self.record(pool, AuditAction::LoggedOut, Some(username), ip).await;
    }

    pub async fn login_failed(&self, pool: &PgPool, username: &str) {
        self.record(pool, AuditAction::LoginFailed, Some(username), None)
            .await;
    }

    async fn record(
        &self,
        pool: &PgPool,
        action: AuditAction,
        username: Option<&str>,
        ip: Option<String>,
    ) {
        let result = sqlx::query("INSERT INTO audit_entries (action, username, ip) VALUES ($1, $2, $3)")
            .bind(action.as_str())
            .bind(username)
            .bind(ip)
            .execute(pool)
            .await;

        if let Err(e) = result {
            tracing::warn!("Failed to write audit entry {}: {:?}", action.as_str(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn logger_for(server: &MockServer, timeout: Duration) -> AuditLogger {
        let url = Url::parse(&server.uri()).unwrap();
        let locator = IpInfoLocator::new(url, timeout).unwrap();
        AuditLogger::new(Some(Arc::new(locator)))
    }

    #[tokio::test]
    async fn successful_lookup_appends_location() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/8.8.8.8/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ip": "8.8.8.8",
                "city": "Mountain View",
                "region": "California",
                "country": "US"
            })))
            .mount(&server)
            .await;

        let logger = logger_for(&server, Duration::from_secs(2));
        let described = logger.describe_ip("8.8.8.8".parse().ok()).await;
        assert_eq!(
            described.as_deref(),
            Some("8.8.8.8, Mountain View California US")
        );
    }

    #[tokio::test]
    async fn error_status_falls_back_to_bare_ip() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let logger = logger_for(&server, Duration::from_secs(2));
        let described = logger.describe_ip("1.1.1.1".parse().ok()).await;
        assert_eq!(described.as_deref(), Some("1.1.1.1"));
    }

    #[tokio::test]
    async fn incomplete_body_falls_back_to_bare_ip() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ip": "10.1.2.3", "bogon": true})),
            )
            .mount(&server)
            .await;

        let logger = logger_for(&server, Duration::from_secs(2));
        let described = logger.describe_ip("10.1.2.3".parse().ok()).await;
        assert_eq!(described.as_deref(), Some("10.1.2.3"));
    }

    #[tokio::test]
    async fn slow_lookup_times_out_to_bare_ip() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(3))
                    .set_body_json(serde_json::json!({
                        "city": "A", "region": "B", "country": "C"
                    })),
            )
            .mount(&server)
            .await;

        let logger = logger_for(&server, Duration::from_millis(100));
        let described = logger.describe_ip("9.9.9.9".parse().ok()).await;
        assert_eq!(described.as_deref(), Some("9.9.9.9"));
    }

    #[tokio::test]
    async fn loopback_is_not_looked_up() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let logger = logger_for(&server, Duration::from_secs(2));
        let described = logger.describe_ip("127.0.0.1".parse().ok()).await;
        assert_eq!(described.as_deref(), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn missing_ip_stays_missing() {
        let logger = AuditLogger::default();
        assert_eq!(logger.describe_ip(None).await, None);
        assert_eq!(
            logger.describe_ip("8.8.4.4".parse().ok()).await.as_deref(),
            Some("8.8.4.4")
        );
    }
}
