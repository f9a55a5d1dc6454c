//! Geocoding and time zone lookup.
//!
//! `MapService` is an enum over the Azure Maps client and an offline
//! gazetteer of well-known cities. Both speak the Azure Maps result shapes
//! defined here.
//!
//! A saved [`Place`] keeps only its zone id. Offsets come from the tz
//! database for the instant being asked about, so daylight saving changes
//! after the place was saved are honored.

pub mod azure;
pub mod gazetteer;

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ServiceError;
use crate::config::MapsConfig;

// ── Result shapes ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub freeform_address: String,
}

/// One `search/address` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub entity_type: Option<String>,
    pub position: Position,
    #[serde(default)]
    pub address: Address,
}

/// One `search/address/reverse` result. `position` is `"lat,lon"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseAddress {
    pub position: String,
    #[serde(default)]
    pub address: Address,
}

impl ReverseAddress {
    pub fn coordinates(&self) -> Option<Position> {
        parse_position(&self.position)
    }
}

/// A time zone and the UTC offset in force at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedZone {
    pub id: String,
    pub utc_offset_seconds: i32,
}

impl ResolvedZone {
    pub fn utc() -> Self {
        Self { id: "UTC".into(), utc_offset_seconds: 0 }
    }

    /// Look `id` up in the tz database at `instant`. `None` for unknown ids.
    pub fn lookup(id: &str, instant: DateTime<Utc>) -> Option<Self> {
        let tz: Tz = id.parse().ok()?;
        let offset = tz.offset_from_utc_datetime(&instant.naive_utc()).fix();
        Some(Self { id: id.to_string(), utc_offset_seconds: offset.local_minus_utc() })
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_seconds).unwrap_or_else(|| Utc.fix())
    }

    /// Wall-clock time in this zone at `instant`.
    pub fn at(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset())
    }
}

/// A geocoded place with its time zone id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub coordinates: Position,
    pub name: String,
    /// Azure entity type (`Municipality`, `PostalCodeArea`, ...).
    pub kind: String,
    /// IANA zone id (`America/Los_Angeles`).
    pub timezone: String,
}

/// First result that is a street address, a municipality or a postal area.
pub fn best_result(results: &[SearchResult]) -> Option<&SearchResult> {
    results.iter().find(|r| {
        r.kind == "Point Address"
            || matches!(r.entity_type.as_deref(), Some("Municipality" | "PostalCodeArea"))
    })
}

/// Parse an Azure offset such as `-08:00:00` or `05:30:00` into seconds.
pub fn parse_offset(text: &str) -> Option<i32> {
    let text = text.trim();
    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let mut parts = rest.split(':');
    let h: i32 = parts.next()?.parse().ok()?;
    let m: i32 = parts.next().unwrap_or("0").parse().ok()?;
    let s: i32 = parts.next().unwrap_or("0").parse().ok()?;
    if parts.next().is_some() || m >= 60 || s >= 60 {
        return None;
    }
    Some(sign * (h * 3600 + m * 60 + s))
}

/// Parse `"lat,lon"`.
pub fn parse_position(text: &str) -> Option<Position> {
    let (lat, lon) = text.split_once(',')?;
    Some(Position { lat: lat.trim().parse().ok()?, lon: lon.trim().parse().ok()? })
}

// ── Service enum ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum MapService {
    Azure(azure::AzureMaps),
    Gazetteer(gazetteer::Gazetteer),
}

impl MapService {
    pub async fn search_address(&self, query: &str) -> Result<Vec<SearchResult>, ServiceError> {
        match self {
            MapService::Azure(m) => m.search_address(query).await,
            MapService::Gazetteer(m) => Ok(m.search_address(query)),
        }
    }

    pub async fn search_address_reverse(&self, query: &str) -> Result<Vec<ReverseAddress>, ServiceError> {
        match self {
            MapService::Azure(m) => m.search_address_reverse(query).await,
            MapService::Gazetteer(m) => Ok(m.search_address_reverse(query)),
        }
    }

    /// First time zone at the coordinates, `None` when the service has none.
    pub async fn timezone_by_coordinates(&self, position: Position) -> Result<Option<ResolvedZone>, ServiceError> {
        match self {
            MapService::Azure(m) => m.timezone_by_coordinates(position).await,
            MapService::Gazetteer(m) => Ok(Some(m.timezone_by_coordinates(position))),
        }
    }

    /// Geocode a free-text place: best search result plus its time zone.
    pub async fn locate(&self, query: &str) -> Result<Option<Place>, ServiceError> {
        let results = self.search_address(query).await?;
        let Some(top) = best_result(&results) else {
            debug!(%query, results = results.len(), "no usable search result");
            return Ok(None);
        };
        let timezone = self.zone_or_utc(top.position).await?;
        Ok(Some(Place {
            coordinates: top.position,
            name: top.address.freeform_address.clone(),
            kind: top.entity_type.clone().unwrap_or_else(|| top.kind.clone()),
            timezone: timezone.id,
        }))
    }

    /// Reverse-geocode device coordinates.
    pub async fn locate_coordinates(&self, position: Position) -> Result<Option<Place>, ServiceError> {
        let query = format!("{},{}", position.lat, position.lon);
        let addresses = self.search_address_reverse(&query).await?;
        let Some(first) = addresses.first() else {
            return Ok(None);
        };
        let coordinates = first.coordinates().unwrap_or(position);
        let timezone = self.zone_or_utc(coordinates).await?;
        Ok(Some(Place {
            coordinates,
            name: first.address.freeform_address.clone(),
            kind: "Geolocation".into(),
            timezone: timezone.id,
        }))
    }

    /// The zone of a saved place at `instant`. Ids the tz database does not
    /// know are looked up again by coordinates.
    pub async fn zone_at(&self, place: &Place, instant: DateTime<Utc>) -> Result<ResolvedZone, ServiceError> {
        if let Some(zone) = ResolvedZone::lookup(&place.timezone, instant) {
            return Ok(zone);
        }
        debug!(zone = %place.timezone, "zone id not in tz database, looking up by coordinates");
        self.zone_or_utc(place.coordinates).await
    }

    async fn zone_or_utc(&self, position: Position) -> Result<ResolvedZone, ServiceError> {
        Ok(self.timezone_by_coordinates(position).await?.unwrap_or_else(|| {
            debug!(lat = position.lat, lon = position.lon, "no time zone, assuming UTC");
            ResolvedZone::utc()
        }))
    }
}

/// Construct a `MapService` from config. `key` comes from `MAP_KEY`.
pub fn build(config: &MapsConfig, key: Option<String>) -> Result<MapService, ServiceError> {
    match config.provider.as_str() {
        "gazetteer" => Ok(MapService::Gazetteer(gazetteer::Gazetteer::new())),
        "azure" => {
            let key = super::require_key(key, "MAP_KEY")?;
            Ok(MapService::Azure(azure::AzureMaps::new(
                config.api_base_url.clone(),
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

    fn result(kind: &str, entity_type: Option<&str>, name: &str) -> SearchResult {
        SearchResult {
            kind: kind.into(),
            entity_type: entity_type.map(str::to_string),
            position: Position { lat: 1.0, lon: 2.0 },
            address: Address { freeform_address: name.into() },
        }
    }

    #[test]
    fn best_result_skips_streets_and_pois() {
        let results = vec![
            result("Street", None, "Main St"),
            result("POI", None, "Space Needle"),
            result("Geography", Some("Municipality"), "Seattle, WA"),
            result("Point Address", None, "1 Microsoft Way"),
        ];
        assert_eq!(best_result(&results).unwrap().address.freeform_address, "Seattle, WA");
        assert!(best_result(&results[..2]).is_none());
        assert_eq!(
            best_result(&[result("Point Address", None, "1 Microsoft Way")])
                .unwrap()
                .address
                .freeform_address,
            "1 Microsoft Way"
        );
    }

    #[test]
    fn offsets_parse() {
        assert_eq!(parse_offset("-08:00:00"), Some(-8 * 3600));
        assert_eq!(parse_offset("05:30:00"), Some(5 * 3600 + 30 * 60));
        assert_eq!(parse_offset("+01:00"), Some(3600));
        assert_eq!(parse_offset("00:00:00"), Some(0));
        assert_eq!(parse_offset("nope"), None);
        assert_eq!(parse_offset("01:75:00"), None);
    }

    #[test]
    fn positions_parse() {
        assert_eq!(parse_position("42.361145,-71.057083"), Some(Position { lat: 42.361145, lon: -71.057083 }));
        assert_eq!(parse_position(" 1.5 , 2 "), Some(Position { lat: 1.5, lon: 2.0 }));
        assert_eq!(parse_position("1.5"), None);
    }

    #[tokio::test]
    async fn gazetteer_locate_and_reverse() {
        let maps = MapService::Gazetteer(gazetteer::Gazetteer::new());

        let place = maps.locate("seattle").await.unwrap().unwrap();
        assert_eq!(place.name, "Seattle, WA");
        assert_eq!(place.kind, "Municipality");
        assert_eq!(place.timezone, "America/Los_Angeles");

        let place = maps
            .locate_coordinates(Position { lat: 42.361145, lon: -71.057083 })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(place.name, "Boston, MA");
        assert_eq!(place.kind, "Geolocation");

        assert!(maps.locate("Atlantis").await.unwrap().is_none());
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn zone_offset() {
        let zone = ResolvedZone { id: "Asia/Colombo".into(), utc_offset_seconds: 19800 };
        assert_eq!(zone.offset().local_minus_utc(), 19800);
        assert_eq!(ResolvedZone::utc().offset().local_minus_utc(), 0);
    }

    #[test]
    fn lookup_follows_daylight_saving() {
        let winter = ResolvedZone::lookup("America/Los_Angeles", utc("2024-01-15T12:00:00Z")).unwrap();
        assert_eq!(winter.utc_offset_seconds, -8 * 3600);
        let summer = ResolvedZone::lookup("America/Los_Angeles", utc("2024-07-15T12:00:00Z")).unwrap();
        assert_eq!(summer.utc_offset_seconds, -7 * 3600);
        assert_eq!(summer.at(utc("2024-07-15T12:00:00Z")).to_rfc3339(), "2024-07-15T05:00:00-07:00");
        assert!(ResolvedZone::lookup("Mars/Olympus_Mons", utc("2024-07-15T12:00:00Z")).is_none());
    }

    #[tokio::test]
    async fn saved_place_zone_is_resolved_per_instant() {
        let maps = MapService::Gazetteer(gazetteer::Gazetteer::new());
        let mut place = maps.locate("london").await.unwrap().unwrap();
        assert_eq!(place.timezone, "Europe/London");

        let zone = maps.zone_at(&place, utc("2024-01-15T12:00:00Z")).await.unwrap();
        assert_eq!(zone.utc_offset_seconds, 0);
        let zone = maps.zone_at(&place, utc("2024-07-15T12:00:00Z")).await.unwrap();
        assert_eq!(zone.utc_offset_seconds, 3600);

        // Unknown ids fall back to a lookup by coordinates.
        place.timezone = "GMT Standard Time".into();
        let zone = maps.zone_at(&place, utc("2024-07-15T12:00:00Z")).await.unwrap();
        assert_eq!(zone.id, "Europe/London");
    }
}
