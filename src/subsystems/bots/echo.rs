//! Echo bot: welcomes new members and repeats what the user says.

use async_trait::async_trait;

use super::{Bot, joined_members};
use crate::activity::ActivityKind;
use crate::error::AppError;
use crate::state::TurnState;
use crate::turn::TurnContext;

pub struct EchoBot;

#[async_trait]
impl Bot for EchoBot {
    fn id(&self) -> &str {
        "echo"
    }

    async fn on_turn(&self, turn: &mut TurnContext, _state: &mut TurnState) -> Result<(), AppError> {
        match turn.activity().kind {
            ActivityKind::ConversationUpdate => {
                let count = joined_members(turn.activity()).count();
                for _ in 0..count {
                    turn.send_text("Welcome to the weather bot.");
                    turn.send_text(
                        "The weather is a typical Redmond weather. Don't believe me, go see for yourself. 😊",
                    );
                    turn.send_text("**FYI**, I'm currently an echo bot and will repeat what you say.");
                }
            }
            ActivityKind::Message => {
                let reply = format!(
                    "Your name is **{}**. You said **{}**",
                    turn.activity().from.display_name(),
                    turn.activity().text()
                );
                turn.send_text(reply);
            }
            ActivityKind::Event => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::bots::testing;

    #[tokio::test]
    async fn welcomes_each_joined_user() {
        let mut turn = TurnContext::new(testing::joined());
        EchoBot.on_turn(&mut turn, &mut TurnState::default()).await.unwrap();
        let texts = testing::texts(turn.replies());
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[0], "Welcome to the weather bot.");
    }

    #[tokio::test]
    async fn echoes_with_name() {
        let mut turn = TurnContext::new(testing::message("sunny?"));
        EchoBot.on_turn(&mut turn, &mut TurnState::default()).await.unwrap();
        assert_eq!(testing::texts(turn.replies()), vec!["Your name is **Ada**. You said **sunny?**"]);
    }
}
