//! Per-request weather context: where and when the user is asking about.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::datetime::{self, DateKind};
use crate::error::AppError;
use crate::services::MapService;
use crate::services::maps::{Place, Position, ResolvedZone};
use crate::services::recognizer::{Recognized, WeatherEntity};
use crate::state::StateBag;

/// User-scope property holding [`UserInfo`].
pub const USER_INFO: &str = "userInfo";
/// Conversation-scope property holding the [`LastMessage`] waiting on a location.
pub const LAST_MESSAGE: &str = "lastMessage";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The message that started onboarding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Place>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherContext {
    pub recognized: Recognized,
    pub coordinates: Option<Position>,
    pub location_type: Option<String>,
    /// Place as the user named it, when they named one.
    pub requested_location: Option<String>,
    /// Place name as the map service resolved it.
    pub resolved_location: Option<String>,
    pub timezone: Option<ResolvedZone>,
    pub date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
    pub date_label: Option<String>,
    pub date_kind: Option<DateKind>,
}

impl WeatherContext {
    /// Resolve the location (named in the utterance, else the saved one) and
    /// the date phrase in that location's time zone.
    ///
    /// A named place is saved as the user's location when they have none.
    pub async fn build(recognized: Recognized, maps: &MapService, user: &mut StateBag) -> Result<Self, AppError> {
        Self::build_at(recognized, maps, user, Utc::now()).await
    }

    pub(crate) async fn build_at(
        recognized: Recognized,
        maps: &MapService,
        user: &mut StateBag,
        instant: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        let mut ctx = Self { recognized, ..Default::default() };
        let Some(place) = locate(&ctx.recognized, maps, user).await? else {
            return Ok(ctx);
        };

        let zone = maps.zone_at(&place, instant).await?;
        ctx.requested_location = ctx.recognized.location_text().map(str::to_string);
        ctx.coordinates = Some(place.coordinates);
        ctx.location_type = Some(place.kind);
        ctx.resolved_location = Some(place.name);
        ctx.resolve_date(zone.at(instant));
        ctx.timezone = Some(zone);
        Ok(ctx)
    }

    pub(crate) fn resolve_date(&mut self, now: DateTime<FixedOffset>) {
        let Some(phrase) = self.recognized.entity_text(WeatherEntity::Datetime) else {
            return;
        };
        match datetime::resolve(phrase, now) {
            Some(r) => {
                debug!(%phrase, kind = r.kind.as_str(), start = %r.start, "resolved date");
                self.date = Some(r.start);
                self.end_date = r.end;
                self.date_label = Some(r.label);
                self.date_kind = Some(r.kind);
            }
            None => debug!(%phrase, "date phrase not understood, using current conditions"),
        }
    }

    /// Resolved place name for replies.
    pub fn location_name(&self) -> &str {
        self.resolved_location
            .as_deref()
            .or(self.requested_location.as_deref())
            .unwrap_or("your location")
    }

    pub fn position(&self) -> Result<Position, AppError> {
        self.coordinates
            .ok_or_else(|| AppError::Dialog("weather context has no coordinates".into()))
    }
}

async fn locate(recognized: &Recognized, maps: &MapService, user: &mut StateBag) -> Result<Option<Place>, AppError> {
    let mut info: UserInfo = user.get(USER_INFO)?.unwrap_or_default();

    if let Some(query) = recognized.location_text() {
        match maps.locate(query).await? {
            Some(place) => {
                if info.location.is_none() {
                    debug!(place = %place.name, "saving first named place as user location");
                    info.location = Some(place.clone());
                    user.set(USER_INFO, &info)?;
                }
                return Ok(Some(place));
            }
            None => debug!(%query, "named place not found, falling back to saved location"),
        }
    }

    Ok(info.location)
}
