//! LUIS v2 prediction endpoint client.
//!
//! `GET https://{region}.api.cognitive.microsoft.com/luis/v2.0/apps/{app_id}`
//! with `subscription-key`, `verbose=true` and `q`.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, trace};

use super::{Entity, IntentScore, Recognized, WeatherEntity};
use crate::services::{ServiceError, check_status, http_client};

#[derive(Debug, Clone)]
pub struct LuisRecognizer {
    client: Client,
    endpoint: String,
    key: String,
}

impl LuisRecognizer {
    pub fn new(region: &str, app_id: &str, key: String, timeout_seconds: u64) -> Result<Self, ServiceError> {
        Ok(Self {
            client: http_client(timeout_seconds)?,
            endpoint: format!("https://{region}.api.cognitive.microsoft.com/luis/v2.0/apps/{app_id}"),
            key,
        })
    }

    pub async fn recognize(&self, text: &str) -> Result<Recognized, ServiceError> {
        debug!(text_len = text.len(), "sending LUIS query");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("subscription-key", self.key.as_str()),
                ("verbose", "true"),
                ("timezoneOffset", "0"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "LUIS request failed (transport)");
                ServiceError::Request(e.to_string())
            })?;
        let response = check_status("LUIS", response).await?;
        let body = response
            .json::<LuisResponse>()
            .await
            .map_err(|e| ServiceError::Decode(format!("LUIS response: {e}")))?;
        trace!(?body, "LUIS response");
        Ok(body.into_recognized(text))
    }
}

// ── Wire types (private) ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LuisResponse {
    #[serde(default)]
    top_scoring_intent: Option<LuisIntent>,
    #[serde(default)]
    intents: Vec<LuisIntent>,
    #[serde(default)]
    entities: Vec<LuisEntity>,
}

#[derive(Debug, Deserialize)]
struct LuisIntent {
    intent: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LuisEntity {
    entity: String,
    #[serde(rename = "type")]
    kind: String,
    start_index: Option<usize>,
    end_index: Option<usize>,
    #[serde(default)]
    resolution: Option<LuisResolution>,
}

#[derive(Debug, Deserialize)]
struct LuisResolution {
    #[serde(default)]
    values: Vec<Value>,
}

impl LuisResponse {
    fn into_recognized(self, text: &str) -> Recognized {
        let mut intents: Vec<IntentScore> = self
            .intents
            .into_iter()
            .map(|i| IntentScore { name: i.intent, score: i.score })
            .collect();
        if intents.is_empty()
            && let Some(top) = self.top_scoring_intent
        {
            intents.push(IntentScore { name: top.intent, score: top.score });
        }

        let entities = self
            .entities
            .into_iter()
            .filter_map(|e| {
                let Some(kind) = WeatherEntity::from_luis_type(&e.kind) else {
                    debug!(kind = %e.kind, "ignoring LUIS entity");
                    return None;
                };
                // LUIS lowercases `entity`; recover the original casing from the span.
                let span = match (e.start_index, e.end_index) {
                    (Some(start), Some(end)) if end >= start => {
                        Some(text.chars().skip(start).take(end - start + 1).collect::<String>())
                    }
                    _ => None,
                };
                let values = e
                    .resolution
                    .map(|r| r.values.into_iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default();
                Some(Entity { kind, text: span.filter(|s| !s.is_empty()).unwrap_or(e.entity), values })
            })
            .collect();

        Recognized { text: text.to_string(), intents, entities }
    }
}
