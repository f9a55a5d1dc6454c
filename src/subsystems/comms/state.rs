//! What channels share: the bot runtime and a back-channel to the comms manager.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::activity::Activity;
use crate::bot_runtime::BotRuntime;
use crate::error::AppError;

// ── Events ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum CommsEvent {
    /// Channel stopped (shutdown or EOF).
    ChannelShutdown { channel_id: String },
    /// A conversation was opened on the channel.
    SessionStarted { channel_id: String, conversation_id: String },
    /// One activity went through the bot.
    TurnCompleted { channel_id: String, conversation_id: String, failed: bool },
}

// ── Session accounting ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelTally {
    pub conversations: BTreeSet<String>,
    pub turns: u64,
    pub failed_turns: u64,
    pub shut_down: bool,
}

/// Per-channel conversation and turn counts, folded from [`CommsEvent`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTally {
    channels: BTreeMap<String, ChannelTally>,
}

impl SessionTally {
    pub fn record(&mut self, event: CommsEvent) {
        match event {
            CommsEvent::ChannelShutdown { channel_id } => {
                self.channels.entry(channel_id).or_default().shut_down = true;
            }
            CommsEvent::SessionStarted { channel_id, conversation_id } => {
                self.channels.entry(channel_id).or_default().conversations.insert(conversation_id);
            }
            CommsEvent::TurnCompleted { channel_id, conversation_id, failed } => {
                let tally = self.channels.entry(channel_id).or_default();
                tally.conversations.insert(conversation_id);
                tally.turns += 1;
                if failed {
                    tally.failed_turns += 1;
                }
            }
        }
    }

    pub fn channel(&self, channel_id: &str) -> Option<&ChannelTally> {
        self.channels.get(channel_id)
    }

    pub fn total_turns(&self) -> u64 {
        self.channels.values().map(|c| c.turns).sum()
    }

    /// One info line per channel that saw any traffic.
    pub fn log_summary(&self) {
        for (channel_id, tally) in &self.channels {
            info!(
                %channel_id,
                conversations = tally.conversations.len(),
                turns = tally.turns,
                failed = tally.failed_turns,
                "channel sessions"
            );
        }
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

pub struct CommsState {
    runtime: Arc<BotRuntime>,
    event_tx: mpsc::Sender<CommsEvent>,
}

impl CommsState {
    pub fn new(runtime: Arc<BotRuntime>, event_tx: mpsc::Sender<CommsEvent>) -> Self {
        Self { runtime, event_tx }
    }

    pub fn bot_id(&self) -> &str {
        self.runtime.bot_id()
    }

    /// Run one turn and hand back the bot's replies.
    pub async fn process(&self, activity: Activity) -> Result<Vec<Activity>, AppError> {
        self.runtime.process(activity).await
    }

    /// Never blocks; the event is dropped if the manager is behind or gone.
    pub fn report_event(&self, event: CommsEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("comms event dropped: {e}");
        }
    }
}
