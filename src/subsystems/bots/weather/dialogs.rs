//! The weather and onboarding waterfalls.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::context::{LAST_MESSAGE, LastMessage, USER_INFO, UserInfo, WeatherContext};
use super::{conditions, forecast};
use crate::dialog::{Dialog, StepContext, StepOutcome};
use crate::error::AppError;
use crate::services::recognizer::WeatherIntent;
use crate::services::{MapService, Recognizer, WeatherService};
use crate::turn::TurnContext;

pub const WEATHER_DIALOG: &str = "weather";
pub const ONBOARD_DIALOG: &str = "onboard";

/// Text carried between steps as `{ "text": ... }`.
fn carried_text(step: &StepContext<'_>) -> String {
    step.result
        .as_ref()
        .and_then(|r| r.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| step.turn.activity().text().to_string())
}

fn user_info(step: &StepContext<'_>) -> Result<UserInfo, AppError> {
    Ok(step.state.user.get(USER_INFO)?.unwrap_or_default())
}

// ── Weather dialog ────────────────────────────────────────────────────────────

/// `begin` → `have_user` → `end`.
pub struct WeatherDialog {
    recognizer: Recognizer,
    maps: MapService,
    weather: WeatherService,
}

impl WeatherDialog {
    pub fn new(recognizer: Recognizer, maps: MapService, weather: WeatherService) -> Self {
        Self { recognizer, maps, weather }
    }

    fn begin(&self, step: &mut StepContext<'_>) -> Result<StepOutcome, AppError> {
        if step.state.user.contains(USER_INFO) {
            let text = step.turn.activity().text().to_string();
            Ok(StepOutcome::Next(Some(json!({ "text": text }))))
        } else {
            Ok(StepOutcome::Begin { dialog: ONBOARD_DIALOG.into(), options: Value::Null })
        }
    }

    async fn have_user(&self, step: &mut StepContext<'_>) -> Result<StepOutcome, AppError> {
        let text = carried_text(step);
        let recognized = self.recognizer.recognize(&text).await?;
        let ctx = WeatherContext::build(recognized, &self.maps, &mut step.state.user).await?;

        if ctx.coordinates.is_some() {
            self.route(step.turn, &ctx).await?;
        } else {
            info!("no location for user, asking the client for one");
            step.turn.send_text(
                "Sorry, I don't know where you are located. If your device supports geolocation, I'll try to retrieve it now.",
            );
            step.state.conversation.set(LAST_MESSAGE, &LastMessage { text })?;
            step.turn.send_event("location", None);
        }
        Ok(StepOutcome::Next(None))
    }

    async fn route(&self, turn: &mut TurnContext, ctx: &WeatherContext) -> Result<(), AppError> {
        let intent = ctx.recognized.top_intent().to_string();
        debug!(%intent, location = ctx.location_name(), date = ?ctx.date_kind, "routing");
        let sent = turn.replies().len();

        match WeatherIntent::from_name(&intent) {
            WeatherIntent::GetForecast => forecast::respond(turn, &self.weather, ctx).await?,
            WeatherIntent::GetConditionsFeature => conditions::feature(turn, &self.weather, ctx).await?,
            WeatherIntent::GetConditionsYesNo => conditions::yes_no(turn, &self.weather, ctx).await?,
            WeatherIntent::Greeting | WeatherIntent::None => {
                turn.send_text(format!("Sorry, I don't understand '{intent}'"))
            }
        }

        if turn.replies().len() == sent {
            debug!("responder sent nothing, falling back to the forecast");
            forecast::respond(turn, &self.weather, ctx).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Dialog for WeatherDialog {
    fn id(&self) -> &str {
        WEATHER_DIALOG
    }

    fn step_count(&self) -> usize {
        3
    }

    async fn run_step(&self, index: usize, step: &mut StepContext<'_>) -> Result<StepOutcome, AppError> {
        match index {
            0 => self.begin(step),
            1 => self.have_user(step).await,
            _ => Ok(StepOutcome::End(None)),
        }
    }
}

// ── Onboarding dialog ─────────────────────────────────────────────────────────

/// Asks a first-time user for their name and location.
pub struct OnboardDialog {
    maps: MapService,
}

impl OnboardDialog {
    pub fn new(maps: MapService) -> Self {
        Self { maps }
    }

    fn begin(&self, step: &mut StepContext<'_>) -> Result<StepOutcome, AppError> {
        if let Some(user) = step.state.user.get::<UserInfo>(USER_INFO)? {
            let text = user.text.clone().unwrap_or_else(|| step.turn.activity().text().to_string());
            return Ok(StepOutcome::End(Some(json!({ "text": text }))));
        }
        let user = UserInfo { text: Some(step.turn.activity().text().to_string()), ..Default::default() };
        step.state.user.set(USER_INFO, &user)?;
        Ok(StepOutcome::Next(None))
    }

    fn capture_name(&self, step: &mut StepContext<'_>) -> Result<StepOutcome, AppError> {
        let name = step.result_text().unwrap_or_default().trim().to_string();
        if name.is_empty() {
            return Ok(StepOutcome::Reprompt("Sorry, what should I call you?".into()));
        }
        let mut user = user_info(step)?;
        user.name = Some(name);
        step.state.user.set(USER_INFO, &user)?;
        Ok(StepOutcome::Next(None))
    }

    async fn capture_location(&self, step: &mut StepContext<'_>) -> Result<StepOutcome, AppError> {
        let query = step.result_text().unwrap_or_default().trim().to_string();
        let place = if query.is_empty() { None } else { self.maps.locate(&query).await? };
        let Some(place) = place else {
            debug!(%query, "onboarding location not found");
            return Ok(StepOutcome::Reprompt(format!(
                "Sorry, I couldn't find '{query}'. Where are you located?"
            )));
        };

        let mut user = user_info(step)?;
        info!(place = %place.name, "user location saved");
        user.location = Some(place);
        step.state.user.set(USER_INFO, &user)?;
        Ok(StepOutcome::Next(None))
    }

    fn end(&self, step: &mut StepContext<'_>) -> Result<StepOutcome, AppError> {
        let user = user_info(step)?;
        let name = user.name.as_deref().unwrap_or_default();
        let place = user.location.as_ref().map(|l| l.name.as_str()).unwrap_or_default();
        let text = user.text.clone().unwrap_or_default();
        step.turn.send_text(format!(
            "Ok, {name}, I'll remember that you are located in {place}. I think you were asking about _{text}..._"
        ));
        Ok(StepOutcome::End(Some(json!({ "text": text }))))
    }
}

#[async_trait]
impl Dialog for OnboardDialog {
    fn id(&self) -> &str {
        ONBOARD_DIALOG
    }

    fn step_count(&self) -> usize {
        6
    }

    async fn run_step(&self, index: usize, step: &mut StepContext<'_>) -> Result<StepOutcome, AppError> {
        match index {
            0 => self.begin(step),
            1 => Ok(StepOutcome::Prompt(
                "It looks like this is your first time here. What should I call you?".into(),
            )),
            2 => self.capture_name(step),
            3 => {
                let user = user_info(step)?;
                Ok(StepOutcome::Prompt(format!(
                    "Ok {}, where are you located?",
                    user.name.as_deref().unwrap_or_default()
                )))
            }
            4 => self.capture_location(step).await,
            _ => self.end(step),
        }
    }
}
