//! Forecast retrieval.
//!
//! `WeatherService` is an enum over the Dark Sky client and a static,
//! deterministic forecast for offline use. Both return the Dark Sky
//! response shape.

pub mod darksky;
pub mod fixture;
pub mod units;

use chrono::{DateTime, FixedOffset, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use super::ServiceError;
use super::maps::Position;
use crate::config::WeatherConfig;

// ── Forecast shape ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    /// Unix seconds.
    pub time: i64,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub temperature_high: Option<f64>,
    #[serde(default)]
    pub temperature_low: Option<f64>,
    #[serde(default)]
    pub precip_type: Option<String>,
    #[serde(default)]
    pub precip_intensity: Option<f64>,
    #[serde(default)]
    pub precip_probability: Option<f64>,
    #[serde(default)]
    pub cloud_cover: Option<f64>,
    #[serde(default)]
    pub wind_gust: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub dew_point: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataBlock {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub data: Vec<DataPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flags {
    pub units: String,
}

impl Default for Flags {
    fn default() -> Self {
        Self { units: "us".into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub currently: Option<DataPoint>,
    #[serde(default)]
    pub hourly: Option<DataBlock>,
    #[serde(default)]
    pub daily: Option<DataBlock>,
    #[serde(default)]
    pub flags: Flags,
}

impl Forecast {
    pub fn units(&self) -> &str {
        &self.flags.units
    }

    pub fn hourly_points(&self) -> &[DataPoint] {
        self.hourly.as_ref().map(|b| b.data.as_slice()).unwrap_or(&[])
    }

    pub fn daily_points(&self) -> &[DataPoint] {
        self.daily.as_ref().map(|b| b.data.as_slice()).unwrap_or(&[])
    }

    /// The first daily point, i.e. today.
    pub fn today(&self) -> Option<&DataPoint> {
        self.daily_points().first()
    }
}

/// Response blocks that can be left out of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Currently,
    Minutely,
    Hourly,
    Daily,
    Alerts,
}

impl Block {
    pub fn as_str(&self) -> &'static str {
        match self {
            Block::Currently => "currently",
            Block::Minutely => "minutely",
            Block::Hourly => "hourly",
            Block::Daily => "daily",
            Block::Alerts => "alerts",
        }
    }
}

// ── Lookups ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Hour,
}

/// The point in the same local day (or hour) as `date`, in `date`'s offset.
pub fn find_time<'a>(
    date: DateTime<FixedOffset>,
    granularity: Granularity,
    points: &'a [DataPoint],
) -> Option<&'a DataPoint> {
    let offset = *date.offset();
    points.iter().find(|p| {
        let Some(t) = offset.timestamp_opt(p.time, 0).single() else {
            return false;
        };
        t.date_naive() == date.date_naive()
            && (granularity == Granularity::Day || t.hour() == date.hour())
    })
}

/// Points with `start <= time < end`.
pub fn find_time_range<'a>(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    points: &'a [DataPoint],
) -> Vec<&'a DataPoint> {
    let (start, end) = (start.timestamp(), end.timestamp());
    points.iter().filter(|p| p.time >= start && p.time < end).collect()
}

// ── Service enum ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum WeatherService {
    DarkSky(darksky::DarkSky),
    Static(fixture::StaticWeather),
}

impl WeatherService {
    pub async fn forecast(&self, position: Position, exclude: &[Block]) -> Result<Forecast, ServiceError> {
        match self {
            WeatherService::DarkSky(s) => s.forecast(position, exclude).await,
            WeatherService::Static(s) => Ok(s.forecast(position, exclude)),
        }
    }
}

/// Construct a `WeatherService` from config. `key` comes from `DARK_SKY_KEY`.
pub fn build(config: &WeatherConfig, key: Option<String>) -> Result<WeatherService, ServiceError> {
    match config.provider.as_str() {
        "static" => Ok(WeatherService::Static(fixture::StaticWeather::new(&config.units))),
        "darksky" => {
            let key = super::require_key(key, "DARK_SKY_KEY")?;
            Ok(WeatherService::DarkSky(darksky::DarkSky::new(
                config.api_base_url.clone(),
                key,
                config.units.clone(),
                config.timeout_seconds,
            )?))
        }
        other => Err(ServiceError::UnknownProvider(other.to_string())),
    }
}
