//! External services the weather bot talks to.
//!
//! Each service is an enum over concrete backends: a hosted API client and
//! an offline stand-in that needs no key and makes no network calls. All
//! wire types stay private to the backend modules.

pub mod maps;
pub mod recognizer;
pub mod weather;

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::error;

use crate::config::Config;

pub use maps::MapService;
pub use recognizer::Recognizer;
pub use weather::WeatherService;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("{0}")]
    Status(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

// ── Bundle ────────────────────────────────────────────────────────────────────

/// The three external services, built once at startup and cheaply cloned.
#[derive(Debug, Clone)]
pub struct Services {
    pub recognizer: Recognizer,
    pub maps: MapService,
    pub weather: WeatherService,
}

impl Services {
    pub fn build(config: &Config) -> Result<Self, ServiceError> {
        Ok(Self {
            recognizer: recognizer::build(&config.luis, config.keys.luis.clone())?,
            maps: maps::build(&config.maps, config.keys.maps.clone())?,
            weather: weather::build(&config.weather, config.keys.dark_sky.clone())?,
        })
    }
}

// ── HTTP helpers ──────────────────────────────────────────────────────────────

pub(crate) fn http_client(timeout_seconds: u64) -> Result<Client, ServiceError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| ServiceError::Request(format!("failed to build HTTP client: {e}")))
}

/// Require a key for a hosted backend.
pub(crate) fn require_key(key: Option<String>, env_var: &str) -> Result<String, ServiceError> {
    key.filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ServiceError::NotConfigured(format!("{env_var} is not set")))
}

/// Map a non-2xx response to `ServiceError::Status`, keeping the body text.
pub(crate) async fn check_status(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    let message = format!("{service} returned HTTP {status}: {}", body.trim());
    error!(%service, %status, "service request returned HTTP error");
    Err(ServiceError::Status(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotKind;

    #[test]
    fn offline_services_need_no_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::offline(BotKind::Weather, tmp.path());
        let services = Services::build(&config).unwrap();
        assert!(matches!(services.recognizer, Recognizer::Keyword(_)));
        assert!(matches!(services.maps, MapService::Gazetteer(_)));
        assert!(matches!(services.weather, WeatherService::Static(_)));
    }

    #[test]
    fn hosted_backend_without_key_is_not_configured() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::offline(BotKind::Weather, tmp.path());
        config.weather.provider = "darksky".into();
        let err = Services::build(&config).unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured(ref m) if m.contains("DARK_SKY_KEY")));
    }

    #[test]
    fn blank_key_is_rejected() {
        assert!(require_key(Some("  ".into()), "MAP_KEY").is_err());
        assert_eq!(require_key(Some("k".into()), "MAP_KEY").unwrap(), "k");
    }

    #[test]
    fn unknown_provider_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::offline(BotKind::Weather, tmp.path());
        config.maps.provider = "bing".into();
        assert!(matches!(
            Services::build(&config).unwrap_err(),
            ServiceError::UnknownProvider(ref p) if p == "bing"
        ));
    }
}
