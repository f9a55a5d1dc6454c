//! Offline gazetteer: a fixed table of cities with coordinates and zones.
//!
//! Offsets come from the tz database. Coordinates far from every city fall
//! back to a whole-hour `Etc/GMT` zone from the longitude.

use chrono::{DateTime, Utc};

use super::{Address, Position, ResolvedZone, ReverseAddress, SearchResult, parse_position};

/// Reverse lookups farther than this from every city find nothing.
const REVERSE_RADIUS_KM: f64 = 50.0;
/// Time zone lookups farther than this fall back to the longitude.
const ZONE_RADIUS_KM: f64 = 1000.0;

struct City {
    names: &'static [&'static str],
    address: &'static str,
    entity_type: &'static str,
    lat: f64,
    lon: f64,
    zone: &'static str,
}

const fn city(names: &'static [&'static str], address: &'static str, lat: f64, lon: f64, zone: &'static str) -> City {
    City { names, address, entity_type: "Municipality", lat, lon, zone }
}

const CITIES: &[City] = &[
    city(&["seattle"], "Seattle, WA", 47.60621, -122.33207, "America/Los_Angeles"),
    city(&["redmond"], "Redmond, WA", 47.67399, -122.12151, "America/Los_Angeles"),
    City {
        names: &["98052"],
        address: "Redmond, WA 98052",
        entity_type: "PostalCodeArea",
        lat: 47.67858,
        lon: -122.13158,
        zone: "America/Los_Angeles",
    },
    city(&["bellevue"], "Bellevue, WA", 47.61038, -122.20068, "America/Los_Angeles"),
    city(&["portland"], "Portland, OR", 45.51523, -122.67838, "America/Los_Angeles"),
    city(&["san francisco", "sf"], "San Francisco, CA", 37.77493, -122.41942, "America/Los_Angeles"),
    city(&["los angeles", "la"], "Los Angeles, CA", 34.05223, -118.24368, "America/Los_Angeles"),
    city(&["phoenix"], "Phoenix, AZ", 33.44838, -112.07404, "America/Phoenix"),
    city(&["denver"], "Denver, CO", 39.73924, -104.99025, "America/Denver"),
    city(&["chicago"], "Chicago, IL", 41.87811, -87.62980, "America/Chicago"),
    city(&["austin"], "Austin, TX", 30.26715, -97.74306, "America/Chicago"),
    city(&["new york", "new york city", "nyc"], "New York, NY", 40.71278, -74.00597, "America/New_York"),
    city(&["boston"], "Boston, MA", 42.36008, -71.05888, "America/New_York"),
    city(&["miami"], "Miami, FL", 25.76168, -80.19179, "America/New_York"),
    city(&["toronto"], "Toronto, ON", 43.65323, -79.38318, "America/Toronto"),
    city(&["london"], "London", 51.50735, -0.12776, "Europe/London"),
    city(&["dublin"], "Dublin", 53.34980, -6.26031, "Europe/Dublin"),
    city(&["paris"], "Paris", 48.85661, 2.35222, "Europe/Paris"),
    city(&["berlin"], "Berlin", 52.52001, 13.40495, "Europe/Berlin"),
    city(&["colombo"], "Colombo", 6.92708, 79.86124, "Asia/Colombo"),
    city(&["singapore"], "Singapore", 1.35208, 103.81984, "Asia/Singapore"),
    city(&["tokyo"], "Tokyo", 35.67620, 139.65031, "Asia/Tokyo"),
];

#[derive(Debug, Clone, Default)]
pub struct Gazetteer;

impl Gazetteer {
    pub fn new() -> Self {
        Self
    }

    /// Match a city name, ignoring case and any `, state/country` suffix.
    pub fn search_address(&self, query: &str) -> Vec<SearchResult> {
        let query = query.trim().to_lowercase();
        let head = query.split(',').next().unwrap_or("").trim().to_string();
        CITIES
            .iter()
            .filter(|c| {
                c.names.contains(&query.as_str())
                    || c.names.contains(&head.as_str())
                    || c.address.to_lowercase() == query
            })
            .map(|c| SearchResult {
                kind: "Geography".into(),
                entity_type: Some(c.entity_type.into()),
                position: Position { lat: c.lat, lon: c.lon },
                address: Address { freeform_address: c.address.into() },
            })
            .collect()
    }

    pub fn search_address_reverse(&self, query: &str) -> Vec<ReverseAddress> {
        let Some(position) = parse_position(query) else {
            return Vec::new();
        };
        nearest(position)
            .filter(|(_, km)| *km <= REVERSE_RADIUS_KM)
            .map(|(c, _)| ReverseAddress {
                position: format!("{},{}", position.lat, position.lon),
                address: Address { freeform_address: c.address.into() },
            })
            .into_iter()
            .collect()
    }

    pub fn timezone_by_coordinates(&self, position: Position) -> ResolvedZone {
        timezone_at(position, Utc::now())
    }
}

pub(crate) fn timezone_at(position: Position, now: DateTime<Utc>) -> ResolvedZone {
    let id = match nearest(position).filter(|(_, km)| *km <= ZONE_RADIUS_KM) {
        Some((c, _)) => c.zone.to_string(),
        None => {
            let hours = (position.lon / 15.0).round() as i32;
            // `Etc/GMT+8` is eight hours *behind* UTC.
            if hours == 0 { "Etc/GMT".to_string() } else { format!("Etc/GMT{:+}", -hours) }
        }
    };
    ResolvedZone::lookup(&id, now).unwrap_or_else(ResolvedZone::utc)
}

fn nearest(position: Position) -> Option<(&'static City, f64)> {
    CITIES
        .iter()
        .map(|c| (c, haversine_km(position, Position { lat: c.lat, lon: c.lon })))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

fn haversine_km(a: Position, b: Position) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
