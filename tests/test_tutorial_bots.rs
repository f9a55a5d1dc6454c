//! Echo, counter and intent bots driven through the bot runtime.

use weather_bot::activity::{Activity, ChannelAccount};
use weather_bot::bot_runtime::BotRuntime;
use weather_bot::config::{BotKind, Config};

fn user() -> ChannelAccount {
    ChannelAccount::new("user-1", Some("Ada"))
}

fn bot() -> ChannelAccount {
    ChannelAccount::new("bot", Some("bot"))
}

fn message(conversation: &str, text: &str) -> Activity {
    Activity::message("test", conversation, user(), bot(), text)
}

fn runtime(kind: BotKind) -> (BotRuntime, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let runtime = BotRuntime::from_config(&Config::offline(kind, tmp.path())).unwrap();
    (runtime, tmp)
}

fn texts(replies: &[Activity]) -> Vec<&str> {
    replies.iter().map(Activity::text).collect()
}

#[tokio::test]
async fn echo_welcomes_then_echoes() {
    let (runtime, _tmp) = runtime(BotKind::Echo);

    let joined = Activity::members_added("test", "c1", user(), bot(), vec![user(), bot()]);
    let replies = runtime.process(joined).await.unwrap();
    assert_eq!(replies.len(), 3, "bot itself is not welcomed");
    assert_eq!(replies[0].text(), "Welcome to the weather bot.");

    let replies = runtime.process(message("c1", "sunny?")).await.unwrap();
    assert_eq!(texts(&replies), vec!["Your name is **Ada**. You said **sunny?**"]);
    assert_eq!(replies[0].recipient, user());
}

#[tokio::test]
async fn counter_is_per_conversation() {
    let (runtime, _tmp) = runtime(BotKind::Counter);

    runtime.process(message("c1", "a")).await.unwrap();
    let replies = runtime.process(message("c1", "b")).await.unwrap();
    assert_eq!(texts(&replies), vec!["Conversation count is 2 and you said \"b\""]);

    let replies = runtime.process(message("c2", "c")).await.unwrap();
    assert_eq!(texts(&replies), vec!["Conversation count is 1 and you said \"c\""]);
}

#[tokio::test]
async fn counter_reports_non_messages() {
    let (runtime, _tmp) = runtime(BotKind::Counter);
    let joined = Activity::members_added("test", "c1", user(), bot(), vec![user()]);
    let replies = runtime.process(joined).await.unwrap();
    assert_eq!(texts(&replies), vec!["[conversationUpdate event detected]"]);
}

#[tokio::test]
async fn intent_bot_names_the_intent() {
    let (runtime, _tmp) = runtime(BotKind::Luis);

    let replies = runtime.process(message("c1", "hi")).await.unwrap();
    assert_eq!(texts(&replies), vec!["The top scoring intent is: **Greeting**", "Hello to you too!"]);

    let replies = runtime.process(message("c1", "what's the forecast for tomorrow")).await.unwrap();
    assert_eq!(replies[0].text(), "The top scoring intent is: **Weather.GetForecast**");
    assert_eq!(replies[1].text(), "I understand you are asking me about the weather forecast.");

    let replies = runtime.process(message("c1", "banana")).await.unwrap();
    assert_eq!(replies[1].text(), "Sorry, I don't understand None. But I'm still learning.");
}
