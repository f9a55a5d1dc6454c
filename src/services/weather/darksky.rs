//! Dark Sky forecast API client.
//!
//! `GET {base}/forecast/{key}/{lat},{lon}?exclude=...&units=...`. The key is
//! part of the path, so request URLs are never logged.

use reqwest::Client;
use tracing::{debug, error};

use super::{Block, Forecast};
use crate::services::maps::Position;
use crate::services::{ServiceError, check_status, http_client};

#[derive(Debug, Clone)]
pub struct DarkSky {
    client: Client,
    api_base_url: String,
    key: String,
    units: String,
}

impl DarkSky {
    pub fn new(api_base_url: String, key: String, units: String, timeout_seconds: u64) -> Result<Self, ServiceError> {
        Ok(Self {
            client: http_client(timeout_seconds)?,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            key,
            units,
        })
    }

    pub async fn forecast(&self, position: Position, exclude: &[Block]) -> Result<Forecast, ServiceError> {
        let url = format!("{}/forecast/{}/{},{}", self.api_base_url, self.key, position.lat, position.lon);
        let exclude = exclude_param(exclude);
        debug!(lat = position.lat, lon = position.lon, %exclude, units = %self.units, "requesting forecast");

        let mut request = self.client.get(&url).query(&[("units", self.units.as_str())]);
        if !exclude.is_empty() {
            request = request.query(&[("exclude", exclude.as_str())]);
        }
        let response = request.send().await.map_err(|e| {
            let e = e.without_url();
            error!(error = %e, "Dark Sky request failed (transport)");
            ServiceError::Request(e.to_string())
        })?;
        let response = check_status("Dark Sky", response).await?;
        response
            .json::<Forecast>()
            .await
            .map_err(|e| ServiceError::Decode(format!("Dark Sky forecast: {}", e.without_url())))
    }
}

fn exclude_param(exclude: &[Block]) -> String {
    exclude.iter().map(Block::as_str).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_joins_blocks() {
        assert_eq!(exclude_param(&[Block::Minutely, Block::Hourly]), "minutely,hourly");
        assert_eq!(exclude_param(&[]), "");
    }
}
