//! Turn state — user- and conversation-scoped property bags.
//!
//! A [`Storage`] backend holds one JSON object per scope key. The runtime
//! loads a [`TurnState`] before the bot runs and saves it afterwards, so bots
//! only ever touch the in-memory [`StateBag`]s.
//!
//! Scope keys:
//! - user:         `{channel_id}/users/{user_id}`
//! - conversation: `{channel_id}/conversations/{conversation_id}`

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::activity::Activity;
use crate::error::AppError;

// ── Storage ───────────────────────────────────────────────────────────────────

/// State storage backends.
///
/// Enum dispatch keeps callers free of trait objects; adding a backend means
/// a new module, a new variant and new match arms.
#[derive(Debug, Clone)]
pub enum Storage {
    Memory(MemoryStorage),
    File(FileStorage),
}

impl Storage {
    pub async fn read(&self, key: &str) -> Result<Option<Value>, AppError> {
        match self {
            Storage::Memory(s) => Ok(s.read(key).await),
            Storage::File(s) => s.read(key).await,
        }
    }

    pub async fn write(&self, key: &str, value: Value) -> Result<(), AppError> {
        match self {
            Storage::Memory(s) => {
                s.write(key, value).await;
                Ok(())
            }
            Storage::File(s) => s.write(key, &value).await,
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        match self {
            Storage::Memory(s) => {
                s.delete(key).await;
                Ok(())
            }
            Storage::File(s) => s.delete(key).await,
        }
    }

    /// Load both scopes for the activity's user and conversation.
    pub async fn load_turn(&self, activity: &Activity) -> Result<TurnState, AppError> {
        let user = self.load_bag(user_key(activity)).await?;
        let conversation = self.load_bag(conversation_key(activity)).await?;
        Ok(TurnState { user, conversation })
    }

    /// Persist any scope that changed during the turn. Empty bags are deleted.
    pub async fn save_turn(&self, state: TurnState) -> Result<(), AppError> {
        for bag in [state.user, state.conversation] {
            if !bag.dirty {
                continue;
            }
            if bag.values.is_empty() {
                debug!(key = %bag.key, "deleting empty state");
                self.delete(&bag.key).await?;
            } else {
                debug!(key = %bag.key, properties = bag.values.len(), "saving state");
                self.write(&bag.key, Value::Object(bag.values)).await?;
            }
        }
        Ok(())
    }

    async fn load_bag(&self, key: String) -> Result<StateBag, AppError> {
        let values = match self.read(&key).await? {
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(AppError::State(format!(
                    "state at '{key}' is not an object: {other}"
                )));
            }
            None => Map::new(),
        };
        Ok(StateBag { key, values, dirty: false })
    }
}

pub fn user_key(activity: &Activity) -> String {
    format!("{}/users/{}", activity.channel_id, activity.from.id)
}

pub fn conversation_key(activity: &Activity) -> String {
    format!("{}/conversations/{}", activity.channel_id, activity.conversation.id)
}

// ── StateBag ──────────────────────────────────────────────────────────────────

/// Named properties within one scope.
#[derive(Debug, Clone, Default)]
pub struct StateBag {
    key: String,
    values: Map<String, Value>,
    dirty: bool,
}

impl StateBag {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn contains(&self, property: &str) -> bool {
        self.values.contains_key(property)
    }

    /// Typed read. `Ok(None)` when the property is absent.
    pub fn get<T: DeserializeOwned>(&self, property: &str) -> Result<Option<T>, AppError> {
        match self.values.get(property) {
            None => Ok(None),
            Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
                AppError::State(format!("malformed property '{property}' in '{}': {e}", self.key))
            }),
        }
    }

    pub fn set<T: Serialize>(&mut self, property: &str, value: &T) -> Result<(), AppError> {
        let v = serde_json::to_value(value)
            .map_err(|e| AppError::State(format!("serialise property '{property}': {e}")))?;
        self.values.insert(property.to_string(), v);
        self.dirty = true;
        Ok(())
    }

    pub fn delete(&mut self, property: &str) {
        if self.values.remove(property).is_some() {
            self.dirty = true;
        }
    }
}

/// Both scopes for one turn.
#[derive(Debug, Clone, Default)]
pub struct TurnState {
    pub user: StateBag,
    pub conversation: StateBag,
}
