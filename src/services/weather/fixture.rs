//! Static forecast for offline runs.
//!
//! Generates a Dark Sky shaped forecast from the coordinates and the local
//! date: the same place on the same day always gets the same weather. Day
//! patterns rotate through clear, partly cloudy, overcast, rain, fog and
//! wind; temperatures follow a daily curve with the low at 03:00 and the
//! high at 15:00.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, TimeZone, Timelike, Utc};
use tracing::trace;

use super::units::{Measure, fahrenheit_to, mph_to, unit_label};
use super::{Block, DataBlock, DataPoint, Flags, Forecast};
use crate::services::maps::{Position, gazetteer};

const HOURS: i64 = 48;
const DAYS: i64 = 8;

struct Pattern {
    icon: &'static str,
    day_summary: &'static str,
    hour_summary: &'static str,
    cloud_cover: f64,
    precip_probability: f64,
    precip_intensity: f64,
    wind_gust_mph: f64,
    foggy: bool,
}

const PATTERNS: [Pattern; 6] = [
    Pattern {
        icon: "clear-day",
        day_summary: "Clear throughout the day.",
        hour_summary: "Clear",
        cloud_cover: 0.05,
        precip_probability: 0.0,
        precip_intensity: 0.0,
        wind_gust_mph: 8.0,
        foggy: false,
    },
    Pattern {
        icon: "partly-cloudy-day",
        day_summary: "Partly cloudy throughout the day.",
        hour_summary: "Partly Cloudy",
        cloud_cover: 0.45,
        precip_probability: 0.05,
        precip_intensity: 0.0,
        wind_gust_mph: 12.0,
        foggy: false,
    },
    Pattern {
        icon: "cloudy",
        day_summary: "Overcast throughout the day.",
        hour_summary: "Overcast",
        cloud_cover: 0.9,
        precip_probability: 0.1,
        precip_intensity: 0.0,
        wind_gust_mph: 15.0,
        foggy: false,
    },
    Pattern {
        icon: "rain",
        day_summary: "Rain throughout the day.",
        hour_summary: "Rain",
        cloud_cover: 0.85,
        precip_probability: 0.7,
        precip_intensity: 0.05,
        wind_gust_mph: 22.0,
        foggy: false,
    },
    Pattern {
        icon: "fog",
        day_summary: "Foggy in the morning.",
        hour_summary: "Foggy",
        cloud_cover: 0.7,
        precip_probability: 0.1,
        precip_intensity: 0.0,
        wind_gust_mph: 6.0,
        foggy: true,
    },
    Pattern {
        icon: "wind",
        day_summary: "Breezy throughout the day.",
        hour_summary: "Breezy",
        cloud_cover: 0.3,
        precip_probability: 0.0,
        precip_intensity: 0.0,
        wind_gust_mph: 42.0,
        foggy: false,
    },
];

#[derive(Debug, Clone)]
pub struct StaticWeather {
    units: String,
}

/// Weather for one local day, in `us` units.
struct Day {
    midnight: DateTime<FixedOffset>,
    pattern: &'static Pattern,
    high: f64,
    low: f64,
}

impl StaticWeather {
    /// `auto` resolves to `us`.
    pub fn new(units: &str) -> Self {
        let units = match units {
            "si" | "ca" | "uk2" | "us" => units,
            _ => "us",
        };
        Self { units: units.to_string() }
    }

    pub fn forecast(&self, position: Position, exclude: &[Block]) -> Forecast {
        self.forecast_at(position, exclude, Utc::now())
    }

    pub(crate) fn forecast_at(&self, position: Position, exclude: &[Block], now: DateTime<Utc>) -> Forecast {
        let zone = gazetteer::timezone_at(position, now);
        let local_now = now.with_timezone(&zone.offset());
        let seed = seed(position);

        let days: Vec<Day> = (0..DAYS)
            .filter_map(|i| day(seed, local_now, i))
            .collect();

        let hourly = self.hourly(&days, local_now);
        let currently = hourly.first().map(|h| DataPoint { time: now.timestamp(), ..h.clone() });
        let hourly_summary = days.first().map(|d| format!("{} throughout the day.", d.pattern.hour_summary));
        let daily_summary = self.week_summary(&days);
        let daily: Vec<DataPoint> = days.iter().map(|d| self.daily_point(d)).collect();

        trace!(lat = position.lat, lon = position.lon, zone = %zone.id, "static forecast");
        Forecast {
            latitude: position.lat,
            longitude: position.lon,
            timezone: Some(zone.id),
            currently: (!exclude.contains(&Block::Currently)).then_some(currently).flatten(),
            hourly: (!exclude.contains(&Block::Hourly)).then(|| DataBlock {
                summary: hourly_summary,
                icon: days.first().map(|d| d.pattern.icon.to_string()),
                data: hourly,
            }),
            daily: (!exclude.contains(&Block::Daily)).then(|| DataBlock {
                summary: Some(daily_summary),
                icon: days.first().map(|d| d.pattern.icon.to_string()),
                data: daily,
            }),
            flags: Flags { units: self.units.clone() },
        }
    }

    fn hourly(&self, days: &[Day], local_now: DateTime<FixedOffset>) -> Vec<DataPoint> {
        let Some(first) = local_now.with_minute(0).and_then(|t| t.with_second(0)).and_then(|t| t.with_nanosecond(0))
        else {
            return Vec::new();
        };
        (0..HOURS)
            .filter_map(|h| {
                let at = first + Duration::hours(h);
                let d = days.iter().find(|d| d.midnight.date_naive() == at.date_naive())?;
                let curve = (1.0 - (2.0 * PI * (at.hour() as f64 - 3.0) / 24.0).cos()) / 2.0;
                let temperature = d.low + (d.high - d.low) * curve;
                Some(DataPoint {
                    time: at.timestamp(),
                    summary: Some(d.pattern.hour_summary.to_string()),
                    icon: Some(d.pattern.icon.to_string()),
                    temperature: Some(self.temp(temperature)),
                    ..self.shared(d)
                })
            })
            .collect()
    }

    fn daily_point(&self, d: &Day) -> DataPoint {
        DataPoint {
            time: d.midnight.timestamp(),
            summary: Some(d.pattern.day_summary.to_string()),
            icon: Some(d.pattern.icon.to_string()),
            temperature_high: Some(self.temp(d.high)),
            temperature_low: Some(self.temp(d.low)),
            ..self.shared(d)
        }
    }

    /// Fields common to the hourly and daily points of a day.
    fn shared(&self, d: &Day) -> DataPoint {
        let p = d.pattern;
        let dew_point = if p.foggy { d.high - 2.0 } else { d.high - 15.0 };
        DataPoint {
            precip_type: (p.precip_probability > 0.0)
                .then(|| if d.low < 32.0 { "snow" } else { "rain" }.to_string()),
            precip_intensity: Some(p.precip_intensity),
            precip_probability: Some(p.precip_probability),
            cloud_cover: Some(p.cloud_cover),
            wind_gust: Some(round2(mph_to(&self.units, p.wind_gust_mph))),
            humidity: Some(if p.foggy { 0.95 } else { 0.6 }),
            dew_point: Some(self.temp(dew_point)),
            ..Default::default()
        }
    }

    fn week_summary(&self, days: &[Day]) -> String {
        let wet: Vec<String> = days
            .iter()
            .filter(|d| d.pattern.precip_intensity > 0.0)
            .map(|d| d.midnight.format("%A").to_string())
            .collect();
        let lead = if wet.is_empty() {
            "No precipitation throughout the week".to_string()
        } else {
            format!("Rain on {}", wet.join(" and "))
        };
        match days.iter().max_by(|a, b| a.high.total_cmp(&b.high)) {
            Some(hottest) => format!(
                "{lead}, with high temperatures peaking at {:.0}{} on {}.",
                self.temp(hottest.high),
                unit_label(Measure::Temperature, &self.units),
                hottest.midnight.format("%A"),
            ),
            None => format!("{lead}."),
        }
    }

    fn temp(&self, f: f64) -> f64 {
        round2(fahrenheit_to(&self.units, f))
    }
}

fn seed(position: Position) -> i64 {
    ((position.lat * 100.0).round() as i64 * 31 + (position.lon * 100.0).round() as i64).abs()
}

fn day(seed: i64, local_now: DateTime<FixedOffset>, index: i64) -> Option<Day> {
    let date = local_now.date_naive() + Duration::days(index);
    let midnight = local_now.offset().from_local_datetime(&date.and_time(NaiveTime::MIN)).single()?;
    let ordinal = date.num_days_from_ce() as i64;
    let pattern = &PATTERNS[((seed + ordinal) % PATTERNS.len() as i64) as usize];
    let high = 50.0 + (seed % 25) as f64 + ((ordinal % 7) as f64 - 3.0) * 2.0;
    Some(Day { midnight, pattern, high, low: high - 14.0 })
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
