//! Bots subsystem — the turn handlers a runtime can be configured with.
//!
//! [`Bot`] is the extension trait: each bot is a `Send + Sync` struct that
//! reacts to one inbound activity by sending replies through the
//! [`TurnContext`] and reading/writing [`TurnState`]. The runtime owns state
//! loading and saving; bots never touch storage directly.
//!
//! Built-in bots: `echo`, `counter`, `luis` and `weather`.

pub mod counter;
pub mod echo;
pub mod luis;
pub mod weather;

use std::sync::Arc;

use async_trait::async_trait;

use crate::activity::{Activity, ChannelAccount};
use crate::config::{BotKind, Config};
use crate::error::AppError;
use crate::services::Services;
use crate::state::TurnState;
use crate::turn::TurnContext;

// ── Bot trait ─────────────────────────────────────────────────────────────────

#[async_trait]
pub trait Bot: Send + Sync {
    /// Bot identifier (matches the `[bot] kind` config value).
    fn id(&self) -> &str;

    async fn on_turn(&self, turn: &mut TurnContext, state: &mut TurnState) -> Result<(), AppError>;
}

/// Construct the configured bot.
pub fn build(config: &Config, services: Services) -> Arc<dyn Bot> {
    match config.bot {
        BotKind::Echo => Arc::new(echo::EchoBot),
        BotKind::Counter => Arc::new(counter::CounterBot),
        BotKind::Luis => Arc::new(luis::LuisBot::new(services.recognizer)),
        BotKind::Weather => Arc::new(weather::WeatherBot::new(services)),
    }
}

/// Members that joined in a conversation update, excluding the bot itself.
pub(crate) fn joined_members(activity: &Activity) -> impl Iterator<Item = &ChannelAccount> {
    activity
        .members_added
        .iter()
        .filter(move |m| m.id != activity.recipient.id)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_is_not_welcomed() {
        let a = testing::joined();
        let joined: Vec<_> = joined_members(&a).map(|m| m.id.as_str()).collect();
        assert_eq!(joined, vec!["user-1"]);
    }

    #[test]
    fn build_picks_configured_bot() {
        let tmp = tempfile::tempdir().unwrap();
        for kind in [BotKind::Echo, BotKind::Counter, BotKind::Luis, BotKind::Weather] {
            let config = Config::offline(kind, tmp.path());
            let services = Services::build(&config).unwrap();
            assert_eq!(build(&config, services).id(), kind.as_str());
        }
    }
}
