//! Weather bot: onboards the user, finds out where they are, and answers
//! forecast and condition questions through the dialog stack.
//!
//! Events:
//! - `location` with value `[lat, lon]`: reverse-geocode and save the user's
//!   location, then echo back the message that was waiting on it as
//!   `location.saved` (or `location.notFound`).
//! - `reset`: forget the user and any pending message.

pub mod conditions;
pub mod context;
pub mod dialogs;
pub mod forecast;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use self::context::{LAST_MESSAGE, USER_INFO, UserInfo};
use self::dialogs::{OnboardDialog, WEATHER_DIALOG, WeatherDialog};
use super::{Bot, joined_members};
use crate::activity::ActivityKind;
use crate::dialog::{DialogSet, DialogTurnStatus};
use crate::error::AppError;
use crate::services::maps::Position;
use crate::services::{MapService, Services};
use crate::state::TurnState;
use crate::turn::TurnContext;

/// Conversation-scope property holding the dialog stack.
const DIALOG_STATE: &str = "dialogState";

const WELCOME_TEXT: &str = "
Welcome to the Weather Bot.

I use the [Dark Sky API](https://darksky.net) to help answer weather related questions in your location.

To begin please set your location by sending an event to this bot.

You can set your location in the form **/location:[long, lat]**.

For example: **/location:[42.361145, -71.057083]** to set it to Boston, MA.
";

pub struct WeatherBot {
    dialogs: DialogSet,
    maps: MapService,
}

impl WeatherBot {
    pub fn new(services: Services) -> Self {
        let dialogs = DialogSet::new(DIALOG_STATE)
            .add(WeatherDialog::new(services.recognizer, services.maps.clone(), services.weather))
            .add(OnboardDialog::new(services.maps.clone()));
        Self { dialogs, maps: services.maps }
    }

    async fn on_message(&self, turn: &mut TurnContext, state: &mut TurnState) -> Result<(), AppError> {
        let status = self.dialogs.continue_dialog(turn, state).await?;
        if !turn.responded() {
            let status = self.dialogs.begin_dialog(WEATHER_DIALOG, Value::Null, turn, state).await?;
            debug!(?status, "began weather dialog");
        } else if status == DialogTurnStatus::Waiting {
            debug!("dialog still waiting on the user");
        }
        Ok(())
    }

    async fn on_event(&self, turn: &mut TurnContext, state: &mut TurnState) -> Result<(), AppError> {
        match turn.activity().value_type.as_deref() {
            Some("location") => self.on_location(turn, state).await,
            Some("reset") => {
                state.user.delete(USER_INFO);
                state.conversation.delete(LAST_MESSAGE);
                self.dialogs.cancel_all(state);
                info!("state reset");
                turn.send_text("State has been reset");
                Ok(())
            }
            other => {
                debug!(event = ?other, "ignoring event");
                Ok(())
            }
        }
    }

    async fn on_location(&self, turn: &mut TurnContext, state: &mut TurnState) -> Result<(), AppError> {
        let value = turn.activity().value.clone().unwrap_or(Value::Null);
        let Ok([lat, lon]) = serde_json::from_value::<[f64; 2]>(value.clone()) else {
            warn!(%value, "location event without [lat, lon]");
            turn.send_event("location.notFound", None);
            return Ok(());
        };

        let Some(place) = self.maps.locate_coordinates(Position { lat, lon }).await? else {
            debug!(lat, lon, "no address near coordinates");
            turn.send_event("location.notFound", None);
            return Ok(());
        };

        info!(place = %place.name, "location saved from device");
        let mut user: UserInfo = state.user.get(USER_INFO)?.unwrap_or_default();
        user.location = Some(place);
        state.user.set(USER_INFO, &user)?;

        let pending: Option<Value> = state.conversation.get(LAST_MESSAGE)?;
        turn.send_event("location.saved", pending);
        state.conversation.delete(LAST_MESSAGE);
        Ok(())
    }
}

#[async_trait]
impl Bot for WeatherBot {
    fn id(&self) -> &str {
        "weather"
    }

    async fn on_turn(&self, turn: &mut TurnContext, state: &mut TurnState) -> Result<(), AppError> {
        match turn.activity().kind {
            ActivityKind::ConversationUpdate => {
                let count = joined_members(turn.activity()).count();
                for _ in 0..count {
                    turn.send_text(WELCOME_TEXT);
                }
                Ok(())
            }
            ActivityKind::Message => self.on_message(turn, state).await,
            ActivityKind::Event => self.on_event(turn, state).await,
        }
    }
}
