//! Bot runtime — runs one inbound activity through the configured bot.
//!
//! Per turn:
//!   1. Translate slash commands (`/location:[lat, lon]`, `/reset`) into events
//!   2. Load user and conversation state
//!   3. Run the bot
//!   4. Save state, or on error log it, skip the save, and apologise
//!
//! Channels hold an `Arc<BotRuntime>` and only ever see replies.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::activity::{Activity, ActivityKind};
use crate::config::{Config, StorageBackend};
use crate::error::AppError;
use crate::services::Services;
use crate::state::{FileStorage, MemoryStorage, Storage};
use crate::subsystems::bots::{self, Bot};
use crate::turn::TurnContext;

pub const TURN_ERROR_TEXT: &str = "Oops, something went wrong! Check your bot's log.";

pub struct BotRuntime {
    bot: Arc<dyn Bot>,
    storage: Storage,
}

impl BotRuntime {
    pub fn new(bot: Arc<dyn Bot>, storage: Storage) -> Self {
        Self { bot, storage }
    }

    /// Build services, storage and the configured bot.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let services = Services::build(config)?;
        let storage = match config.storage {
            StorageBackend::Memory => Storage::Memory(MemoryStorage::new()),
            StorageBackend::File => Storage::File(FileStorage::open(config.state_dir())?),
        };
        let bot = bots::build(config, services);
        info!(bot = bot.id(), storage = ?config.storage, "bot runtime ready");
        Ok(Self::new(bot, storage))
    }

    pub fn bot_id(&self) -> &str {
        self.bot.id()
    }

    /// Run one turn and return everything the bot sent.
    ///
    /// Bot errors become [`TURN_ERROR_TEXT`]; only storage failures are
    /// returned as `Err`.
    pub async fn process(&self, activity: Activity) -> Result<Vec<Activity>, AppError> {
        let activity = translate_command(activity);
        debug!(
            kind = activity.kind.as_str(),
            conversation = %activity.conversation.id,
            from = %activity.from.id,
            "turn started"
        );

        let mut state = self.storage.load_turn(&activity).await?;
        let mut turn = TurnContext::new(activity);

        match self.bot.on_turn(&mut turn, &mut state).await {
            Ok(()) => self.storage.save_turn(state).await?,
            Err(e) => {
                error!(bot = self.bot.id(), "turn failed: {e}");
                turn.send_text(TURN_ERROR_TEXT);
            }
        }

        let replies = turn.into_replies();
        debug!(replies = replies.len(), "turn finished");
        Ok(replies)
    }
}

/// Turn a `/name` or `/name:value` message into an event named `name`.
///
/// `value` is parsed as JSON when it can be, else kept as a string. Anything
/// else passes through untouched.
pub fn translate_command(activity: Activity) -> Activity {
    if activity.kind != ActivityKind::Message {
        return activity;
    }
    let Some(command) = activity.text().trim().strip_prefix('/') else {
        return activity;
    };

    let (name, raw) = match command.split_once(':') {
        Some((name, raw)) => (name.trim(), Some(raw.trim())),
        None => (command.trim(), None),
    };
    if name.is_empty() || name.contains(char::is_whitespace) {
        return activity;
    }

    let value = raw
        .filter(|r| !r.is_empty())
        .map(|r| serde_json::from_str(r).unwrap_or_else(|_| Value::String(r.to_string())));
    debug!(event = %name, ?value, "command translated to event");

    let mut event = activity.clone();
    event.kind = ActivityKind::Event;
    event.text = None;
    event.value_type = Some(name.to_string());
    event.value = value;
    event
}
