//! Azure Maps REST client (`api-version=1.0`).

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::{Position, ResolvedZone, ReverseAddress, SearchResult, parse_offset};
use crate::services::{ServiceError, check_status, http_client};

const API_VERSION: &str = "1.0";

#[derive(Debug, Clone)]
pub struct AzureMaps {
    client: Client,
    api_base_url: String,
    key: String,
}

impl AzureMaps {
    pub fn new(api_base_url: String, key: String, timeout_seconds: u64) -> Result<Self, ServiceError> {
        Ok(Self {
            client: http_client(timeout_seconds)?,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            key,
        })
    }

    pub async fn search_address(&self, query: &str) -> Result<Vec<SearchResult>, ServiceError> {
        let body: SearchResponse = self.get("search/address/json", query).await?;
        debug!(%query, results = body.results.len(), "address search");
        Ok(body.results)
    }

    pub async fn search_address_reverse(&self, query: &str) -> Result<Vec<ReverseAddress>, ServiceError> {
        let body: ReverseResponse = self.get("search/address/reverse/json", query).await?;
        debug!(%query, addresses = body.addresses.len(), "reverse address search");
        Ok(body.addresses)
    }

    pub async fn timezone_by_coordinates(&self, position: Position) -> Result<Option<ResolvedZone>, ServiceError> {
        let query = format!("{},{}", position.lat, position.lon);
        let body: TimezoneResponse = self.get("timezone/byCoordinates/json", &query).await?;
        Ok(body.time_zones.into_iter().next().map(TimeZone::resolve))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T, ServiceError> {
        let url = format!("{}/{path}", self.api_base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("api-version", API_VERSION),
                ("subscription-key", self.key.as_str()),
                ("query", query),
            ])
            .send()
            .await
            .map_err(|e| {
                error!(%path, error = %e, "Azure Maps request failed (transport)");
                ServiceError::Request(e.to_string())
            })?;
        let response = check_status("Azure Maps", response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::Decode(format!("Azure Maps {path}: {e}")))
    }
}

// ── Wire types (private) ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    addresses: Vec<ReverseAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TimezoneResponse {
    #[serde(default)]
    time_zones: Vec<TimeZone>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TimeZone {
    id: String,
    reference_time: Option<ReferenceTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReferenceTime {
    standard_offset: String,
    #[serde(default)]
    daylight_savings: String,
}

impl TimeZone {
    /// Standard offset plus the daylight saving offset in force now.
    fn resolve(self) -> ResolvedZone {
        let seconds = self
            .reference_time
            .map(|r| parse_offset(&r.standard_offset).unwrap_or(0) + parse_offset(&r.daylight_savings).unwrap_or(0))
            .unwrap_or(0);
        ResolvedZone { id: self.id, utc_offset_seconds: seconds }
    }
}
