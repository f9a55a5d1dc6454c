//! Intent bot: reports the top intent the recognizer found.

use async_trait::async_trait;
use tracing::debug;

use super::{Bot, joined_members};
use crate::activity::ActivityKind;
use crate::error::AppError;
use crate::services::Recognizer;
use crate::services::recognizer::WeatherIntent;
use crate::state::TurnState;
use crate::turn::TurnContext;

pub struct LuisBot {
    recognizer: Recognizer,
}

impl LuisBot {
    pub fn new(recognizer: Recognizer) -> Self {
        Self { recognizer }
    }
}

#[async_trait]
impl Bot for LuisBot {
    fn id(&self) -> &str {
        "luis"
    }

    async fn on_turn(&self, turn: &mut TurnContext, _state: &mut TurnState) -> Result<(), AppError> {
        match turn.activity().kind {
            ActivityKind::ConversationUpdate => {
                let count = joined_members(turn.activity()).count();
                for _ in 0..count {
                    turn.send_text("Welcome to the weather bot. Please say hi");
                    turn.send_text(
                        "Or ask me a weather related question and I'll try my best to figure out your intent using **LUIS** - Language Understanding Intelligent Service.",
                    );
                }
            }
            ActivityKind::Message => {
                let recognized = self.recognizer.recognize(turn.activity().text()).await?;
                let intent = recognized.top_intent().to_string();
                debug!(%intent, entities = ?recognized.entities, "recognized");

                turn.send_text(format!("The top scoring intent is: **{intent}**"));
                match WeatherIntent::from_name(&intent) {
                    WeatherIntent::Greeting => turn.send_text("Hello to you too!"),
                    WeatherIntent::GetForecast => {
                        turn.send_text("I understand you are asking me about the weather forecast.")
                    }
                    WeatherIntent::GetConditionsFeature => turn.send_text(
                        "I understand you are asking me about a specific weather condition or feature.",
                    ),
                    WeatherIntent::GetConditionsYesNo => turn.send_text(
                        "I understand you are asking me about weather conditions that require me to give a yes or no response.",
                    ),
                    WeatherIntent::None => {
                        turn.send_text(format!("Sorry, I don't understand {intent}. But I'm still learning."))
                    }
                }
            }
            ActivityKind::Event => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::recognizer::keyword::KeywordRecognizer;
    use crate::subsystems::bots::testing;

    fn bot() -> LuisBot {
        LuisBot::new(Recognizer::Keyword(KeywordRecognizer::new()))
    }

    async fn say(text: &str) -> Vec<String> {
        let mut turn = TurnContext::new(testing::message(text));
        bot().on_turn(&mut turn, &mut TurnState::default()).await.unwrap();
        testing::texts(turn.replies()).into_iter().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn greeting() {
        assert_eq!(say("hello").await, vec!["The top scoring intent is: **Greeting**", "Hello to you too!"]);
    }

    #[tokio::test]
    async fn forecast_and_conditions() {
        let replies = say("what's the weather tomorrow").await;
        assert_eq!(replies[0], "The top scoring intent is: **Weather.GetForecast**");
        assert!(replies[1].contains("weather forecast"));

        let replies = say("will it snow").await;
        assert_eq!(replies[0], "The top scoring intent is: **Weather.GetConditionsYesNo**");
        assert!(replies[1].contains("yes or no"));
    }

    #[tokio::test]
    async fn unknown_intent() {
        assert_eq!(
            say("banana").await,
            vec!["The top scoring intent is: **None**", "Sorry, I don't understand None. But I'm still learning."]
        );
    }

    #[tokio::test]
    async fn welcome() {
        let mut turn = TurnContext::new(testing::joined());
        bot().on_turn(&mut turn, &mut TurnState::default()).await.unwrap();
        assert_eq!(turn.replies().len(), 2);
        assert_eq!(turn.replies()[0].text(), "Welcome to the weather bot. Please say hi");
    }
}
