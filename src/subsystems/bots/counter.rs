//! Counter bot: counts messages per conversation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Bot;
use crate::error::AppError;
use crate::state::TurnState;
use crate::turn::TurnContext;

const COUNTER_PROPERTY: &str = "counterState";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CounterState {
    count: u64,
}

pub struct CounterBot;

#[async_trait]
impl Bot for CounterBot {
    fn id(&self) -> &str {
        "counter"
    }

    async fn on_turn(&self, turn: &mut TurnContext, state: &mut TurnState) -> Result<(), AppError> {
        if !turn.activity().is_message() {
            let reply = format!("[{} event detected]", turn.activity().kind.as_str());
            turn.send_text(reply);
            return Ok(());
        }

        let mut counter: CounterState = state.conversation.get(COUNTER_PROPERTY)?.unwrap_or_default();
        counter.count += 1;
        state.conversation.set(COUNTER_PROPERTY, &counter)?;

        let reply = format!(
            "Conversation count is {} and you said \"{}\"",
            counter.count,
            turn.activity().text()
        );
        turn.send_text(reply);
        Ok(())
    }
}
