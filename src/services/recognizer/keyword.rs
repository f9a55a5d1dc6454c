//! Offline keyword recognizer.
//!
//! Recognises the weather intents from keyword tables, places introduced by
//! `in` or `for`, and date/time phrases the [`crate::datetime`] resolver
//! understands. Good enough for the console and for tests; no network.

use chrono::Utc;

use super::{Entity, IntentScore, Recognized, WeatherCondition, WeatherEntity, WeatherIntent, WeatherPrecipitation};
use crate::datetime;

const GREETINGS: &[&str] = &["hi", "hello", "hey", "howdy", "greetings", "hiya", "yo"];

const FORECAST_WORDS: &[&str] = &["weather", "forecast", "conditions", "outside", "like"];

const CONDITIONS: &[(&str, WeatherCondition)] = &[
    ("high", WeatherCondition::High),
    ("highs", WeatherCondition::High),
    ("low", WeatherCondition::Low),
    ("lows", WeatherCondition::Low),
    ("temperature", WeatherCondition::Temperature),
    ("temp", WeatherCondition::Temperature),
    ("degrees", WeatherCondition::Temperature),
    ("hot", WeatherCondition::Heat),
    ("heat", WeatherCondition::Heat),
    ("warm", WeatherCondition::Heat),
    ("cold", WeatherCondition::Cold),
    ("chilly", WeatherCondition::Cold),
    ("freezing", WeatherCondition::Cold),
    ("cloudy", WeatherCondition::CloudCoverage),
    ("clouds", WeatherCondition::CloudCoverage),
    ("overcast", WeatherCondition::CloudCoverage),
    ("sunny", WeatherCondition::Sun),
    ("sun", WeatherCondition::Sun),
    ("sunshine", WeatherCondition::Sun),
    ("windy", WeatherCondition::WindGust),
    ("wind", WeatherCondition::WindGust),
    ("gusty", WeatherCondition::WindGust),
    ("humid", WeatherCondition::Humidity),
    ("humidity", WeatherCondition::Humidity),
    ("muggy", WeatherCondition::Humidity),
    ("fog", WeatherCondition::Fog),
    ("foggy", WeatherCondition::Fog),
];

const PRECIPITATION: &[(&str, WeatherPrecipitation)] = &[
    ("rain", WeatherPrecipitation::Rain),
    ("raining", WeatherPrecipitation::Rain),
    ("rainy", WeatherPrecipitation::Rain),
    ("showers", WeatherPrecipitation::Rain),
    ("drizzle", WeatherPrecipitation::Rain),
    ("snow", WeatherPrecipitation::Snow),
    ("snowing", WeatherPrecipitation::Snow),
    ("snowy", WeatherPrecipitation::Snow),
    ("sleet", WeatherPrecipitation::Sleet),
    ("sleeting", WeatherPrecipitation::Sleet),
];

/// Words that can appear inside a date/time phrase.
const DATETIME_WORDS: &[&str] = &[
    "today", "tonight", "tomorrow", "yesterday", "day", "days", "after", "morning", "afternoon",
    "evening", "night", "week", "weekend", "this", "next", "in", "on", "at", "by", "around",
    "about", "between", "from", "and", "to", "until", "till", "noon", "midday", "midnight", "am",
    "pm", "few", "couple", "of", "the", "over", "oclock", "monday", "tuesday", "wednesday",
    "thursday", "friday", "saturday", "sunday", "one", "two", "three", "four", "five", "six",
    "seven", "eight", "nine", "ten", "january", "february", "march", "april", "may", "june", "july",
    "august", "september", "october", "november", "december", "jan", "feb", "mar", "apr", "jun",
    "jul", "aug", "sep", "sept", "oct", "nov", "dec",
];

/// Connectors that never end a date/time phrase.
const TRAILING_CONNECTORS: &[&str] = &["in", "on", "at", "by", "and", "to", "the", "of", "from", "over", "around", "about", "between"];

/// Words that end a place name.
const PLACE_STOPS: &[&str] = &[
    "today", "tonight", "tomorrow", "this", "next", "on", "at", "right", "now", "please", "and",
    "is", "will", "be", "going", "for", "in", "during", "later",
];

#[derive(Debug, Clone, Default)]
pub struct KeywordRecognizer;

struct Word {
    original: String,
    lower: String,
}

impl KeywordRecognizer {
    pub fn new() -> Self {
        Self
    }

    pub fn recognize(&self, text: &str) -> Recognized {
        let words: Vec<Word> = text
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != ':'))
            .filter(|w| !w.is_empty())
            .map(|w| Word { original: w.to_string(), lower: w.to_lowercase().replace('\'', "") })
            .collect();

        let mut entities = Vec::new();

        let datetime_span = find_datetime(&words);
        if let Some((start, end)) = datetime_span {
            entities.push(Entity {
                kind: WeatherEntity::Datetime,
                text: join(&words[start..end]),
                values: vec![],
            });
        }

        if let Some(place) = find_place(&words, datetime_span) {
            entities.push(Entity { kind: WeatherEntity::Location, text: place, values: vec![] });
        }

        let condition = words.iter().find_map(|w| {
            CONDITIONS
                .iter()
                .find(|(k, _)| *k == w.lower)
                .map(|(_, c)| (w, *c))
        });
        if let Some((w, c)) = condition {
            entities.push(Entity {
                kind: WeatherEntity::Condition,
                text: w.original.clone(),
                values: vec![condition_value(c)],
            });
        }

        let precipitation = words.iter().find_map(|w| {
            PRECIPITATION
                .iter()
                .find(|(k, _)| *k == w.lower)
                .map(|(_, p)| (w, *p))
        });
        if let Some((w, p)) = precipitation {
            entities.push(Entity {
                kind: WeatherEntity::Precipitation,
                text: w.original.clone(),
                values: vec![p.as_str().to_string()],
            });
        }

        let has = |set: &[&str]| words.iter().any(|w| set.contains(&w.lower.as_str()));
        let condition = condition.map(|(_, c)| c);

        let intent = if precipitation.is_some() {
            WeatherIntent::GetConditionsYesNo
        } else if let Some(c) = condition {
            match c {
                WeatherCondition::High | WeatherCondition::Low | WeatherCondition::Temperature => {
                    WeatherIntent::GetConditionsFeature
                }
                _ => WeatherIntent::GetConditionsYesNo,
            }
        } else if has(FORECAST_WORDS) || datetime_span.is_some() || entities.iter().any(|e| e.kind == WeatherEntity::Location) {
            WeatherIntent::GetForecast
        } else if has(GREETINGS) {
            WeatherIntent::Greeting
        } else {
            WeatherIntent::None
        };

        let mut intents = vec![IntentScore { name: intent.as_str().to_string(), score: 0.9 }];
        if intent != WeatherIntent::None {
            intents.push(IntentScore { name: WeatherIntent::None.as_str().to_string(), score: 0.1 });
        }

        Recognized { text: text.to_string(), intents, entities }
    }
}

fn condition_value(c: WeatherCondition) -> String {
    serde_json::to_value(c)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn join(words: &[Word]) -> String {
    words.iter().map(|w| w.original.as_str()).collect::<Vec<_>>().join(" ")
}

fn is_datetime_word(lower: &str) -> bool {
    DATETIME_WORDS.contains(&lower) || lower.starts_with(|c: char| c.is_ascii_digit())
}

/// First run of date/time words that resolves, as a `[start, end)` word span.
fn find_datetime(words: &[Word]) -> Option<(usize, usize)> {
    let now = Utc::now().fixed_offset();
    let mut i = 0;
    while i < words.len() {
        if !is_datetime_word(&words[i].lower) {
            i += 1;
            continue;
        }
        let start = i;
        while i < words.len() && is_datetime_word(&words[i].lower) {
            i += 1;
        }
        let mut end = i;
        while end > start && TRAILING_CONNECTORS.contains(&words[end - 1].lower.as_str()) {
            end -= 1;
        }
        if end > start {
            let phrase = words[start..end].iter().map(|w| w.lower.as_str()).collect::<Vec<_>>().join(" ");
            if datetime::resolve(&phrase, now).is_some() {
                return Some((start, end));
            }
        }
    }
    None
}

/// Words following `in` or `for`, up to a stop word or the date/time span.
fn find_place(words: &[Word], datetime_span: Option<(usize, usize)>) -> Option<String> {
    let in_span = |i: usize| datetime_span.is_some_and(|(s, e)| i >= s && i < e);
    for (i, w) in words.iter().enumerate() {
        if !(w.lower == "in" || w.lower == "for") || in_span(i) {
            continue;
        }
        let place: Vec<&Word> = words[i + 1..]
            .iter()
            .enumerate()
            .take_while(|(j, w)| !in_span(i + 1 + j) && !PLACE_STOPS.contains(&w.lower.as_str()))
            .map(|(_, w)| w)
            .collect();
        let first = place.first().map(|w| w.lower.as_str());
        if place.is_empty() || matches!(first, Some("the" | "a" | "my")) {
            continue;
        }
        return Some(place.iter().map(|w| w.original.as_str()).collect::<Vec<_>>().join(" "));
    }
    None
}
