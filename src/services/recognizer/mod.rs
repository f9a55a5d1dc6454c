//! Intent and entity recognition.
//!
//! `Recognizer` is an enum over the LUIS client and an offline keyword
//! recognizer. Both produce the same [`Recognized`] shape, with entity kinds
//! normalised to [`WeatherEntity`].

pub mod keyword;
pub mod luis;

use serde::{Deserialize, Serialize};

use super::ServiceError;
use crate::config::LuisConfig;

// ── Vocabulary ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherIntent {
    Greeting,
    GetForecast,
    GetConditionsFeature,
    GetConditionsYesNo,
    None,
}

impl WeatherIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherIntent::Greeting => "Greeting",
            WeatherIntent::GetForecast => "Weather.GetForecast",
            WeatherIntent::GetConditionsFeature => "Weather.GetConditionsFeature",
            WeatherIntent::GetConditionsYesNo => "Weather.GetConditionsYesNo",
            WeatherIntent::None => "None",
        }
    }

    /// Any unrecognised name maps to `None`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Greeting" => WeatherIntent::Greeting,
            "Weather.GetForecast" => WeatherIntent::GetForecast,
            "Weather.GetConditionsFeature" => WeatherIntent::GetConditionsFeature,
            "Weather.GetConditionsYesNo" => WeatherIntent::GetConditionsYesNo,
            _ => WeatherIntent::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeatherEntity {
    Location,
    City,
    Poi,
    State,
    CountryRegion,
    Datetime,
    Condition,
    Precipitation,
}

impl WeatherEntity {
    /// Place-like entities, most specific first.
    pub const LOCATION_PRIORITY: [WeatherEntity; 5] = [
        WeatherEntity::Location,
        WeatherEntity::City,
        WeatherEntity::Poi,
        WeatherEntity::State,
        WeatherEntity::CountryRegion,
    ];

    /// Normalise a LUIS entity type such as `builtin.geographyV2.city` or
    /// `Weather.Condition`.
    pub fn from_luis_type(kind: &str) -> Option<Self> {
        if kind.starts_with("builtin.datetimeV2") {
            return Some(WeatherEntity::Datetime);
        }
        let name = kind
            .strip_prefix("builtin.geographyV2.")
            .or_else(|| kind.strip_prefix("Weather."))
            .unwrap_or(kind);
        Some(match name.to_ascii_lowercase().as_str() {
            "location" => WeatherEntity::Location,
            "city" => WeatherEntity::City,
            "poi" => WeatherEntity::Poi,
            "state" => WeatherEntity::State,
            "countryregion" => WeatherEntity::CountryRegion,
            "datetime" => WeatherEntity::Datetime,
            "condition" => WeatherEntity::Condition,
            "precipitation" => WeatherEntity::Precipitation,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeatherCondition {
    High,
    Low,
    Temperature,
    Heat,
    Cold,
    CloudCoverage,
    Sun,
    WindGust,
    Humidity,
    Fog,
}

impl WeatherCondition {
    pub fn from_value(value: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::from(value)).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherPrecipitation {
    Rain,
    Snow,
    Sleet,
}

impl WeatherPrecipitation {
    pub fn from_value(value: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::from(value)).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherPrecipitation::Rain => "rain",
            WeatherPrecipitation::Snow => "snow",
            WeatherPrecipitation::Sleet => "sleet",
        }
    }
}

// ── Result ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: WeatherEntity,
    /// Text as it appeared in the utterance.
    pub text: String,
    /// Normalised values (list entities); empty for free-text entities.
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recognized {
    pub text: String,
    pub intents: Vec<IntentScore>,
    pub entities: Vec<Entity>,
}

impl Recognized {
    /// Highest-scoring intent name, `"None"` when there are no intents.
    pub fn top_intent(&self) -> &str {
        self.intents
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .map(|i| i.name.as_str())
            .unwrap_or("None")
    }

    pub fn intent(&self) -> WeatherIntent {
        WeatherIntent::from_name(self.top_intent())
    }

    pub fn entity(&self, kind: WeatherEntity) -> Option<&Entity> {
        self.entities.iter().find(|e| e.kind == kind)
    }

    pub fn entity_text(&self, kind: WeatherEntity) -> Option<&str> {
        self.entity(kind).map(|e| e.text.as_str())
    }

    /// First normalised value, falling back to the entity text.
    pub fn entity_value(&self, kind: WeatherEntity) -> Option<&str> {
        self.entity(kind)
            .map(|e| e.values.first().map(String::as_str).unwrap_or(e.text.as_str()))
    }

    /// The place named in the utterance, by [`WeatherEntity::LOCATION_PRIORITY`].
    pub fn location_text(&self) -> Option<&str> {
        WeatherEntity::LOCATION_PRIORITY
            .iter()
            .find_map(|kind| self.entity_text(*kind))
    }

    pub fn condition(&self) -> Option<WeatherCondition> {
        self.entity_value(WeatherEntity::Condition)
            .and_then(WeatherCondition::from_value)
    }

    pub fn precipitation(&self) -> Option<WeatherPrecipitation> {
        self.entity_value(WeatherEntity::Precipitation)
            .and_then(WeatherPrecipitation::from_value)
    }
}

// ── Recognizer enum ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Recognizer {
    Luis(luis::LuisRecognizer),
    Keyword(keyword::KeywordRecognizer),
}

impl Recognizer {
    pub async fn recognize(&self, text: &str) -> Result<Recognized, ServiceError> {
        match self {
            Recognizer::Luis(r) => r.recognize(text).await,
            Recognizer::Keyword(r) => Ok(r.recognize(text)),
        }
    }
}

/// Construct a `Recognizer` from config. `key` comes from
/// `LUIS_SUBSCRIPTION_KEY` and is only required by the `luis` backend.
pub fn build(config: &LuisConfig, key: Option<String>) -> Result<Recognizer, ServiceError> {
    match config.provider.as_str() {
        "keyword" => Ok(Recognizer::Keyword(keyword::KeywordRecognizer::new())),
        "luis" => {
            let key = super::require_key(key, "LUIS_SUBSCRIPTION_KEY")?;
            if config.app_id.trim().is_empty() {
                return Err(ServiceError::NotConfigured("[luis] app_id is empty".into()));
            }
            Ok(Recognizer::Luis(luis::LuisRecognizer::new(
                &config.region,
                &config.app_id,
                key,
                config.timeout_seconds,
            )?))
        }
        other => Err(ServiceError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(kind: WeatherEntity, text: &str, values: &[&str]) -> Entity {
        Entity {
            kind,
            text: text.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn top_intent_picks_highest_score() {
        let r = Recognized {
            text: "hi".into(),
            intents: vec![
                IntentScore { name: "None".into(), score: 0.2 },
                IntentScore { name: "Greeting".into(), score: 0.9 },
            ],
            entities: vec![],
        };
        assert_eq!(r.top_intent(), "Greeting");
        assert_eq!(r.intent(), WeatherIntent::Greeting);
        assert_eq!(Recognized::default().top_intent(), "None");
    }

    #[test]
    fn location_priority() {
        let r = Recognized {
            entities: vec![
                entity(WeatherEntity::State, "Washington", &[]),
                entity(WeatherEntity::City, "Seattle", &[]),
            ],
            ..Default::default()
        };
        assert_eq!(r.location_text(), Some("Seattle"));
    }

    #[test]
    fn list_entities_use_normalised_values() {
        let r = Recognized {
            entities: vec![
                entity(WeatherEntity::Condition, "cloudy", &["cloudCoverage"]),
                entity(WeatherEntity::Precipitation, "raining", &["rain"]),
            ],
            ..Default::default()
        };
        assert_eq!(r.entity_text(WeatherEntity::Condition), Some("cloudy"));
        assert_eq!(r.condition(), Some(WeatherCondition::CloudCoverage));
        assert_eq!(r.precipitation(), Some(WeatherPrecipitation::Rain));
    }

    #[test]
    fn luis_types_normalise() {
        assert_eq!(WeatherEntity::from_luis_type("builtin.geographyV2.city"), Some(WeatherEntity::City));
        assert_eq!(
            WeatherEntity::from_luis_type("builtin.geographyV2.countryRegion"),
            Some(WeatherEntity::CountryRegion)
        );
        assert_eq!(WeatherEntity::from_luis_type("builtin.datetimeV2.daterange"), Some(WeatherEntity::Datetime));
        assert_eq!(WeatherEntity::from_luis_type("Weather.Condition"), Some(WeatherEntity::Condition));
        assert_eq!(WeatherEntity::from_luis_type("builtin.number"), None);
    }

    #[test]
    fn intent_names_round_trip() {
        for intent in [
            WeatherIntent::Greeting,
            WeatherIntent::GetForecast,
            WeatherIntent::GetConditionsFeature,
            WeatherIntent::GetConditionsYesNo,
            WeatherIntent::None,
        ] {
            assert_eq!(WeatherIntent::from_name(intent.as_str()), intent);
        }
        assert_eq!(WeatherIntent::from_name("Weather.Unknown"), WeatherIntent::None);
    }
}
