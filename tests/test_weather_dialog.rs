//! Weather bot conversations through the bot runtime, offline services.

use serde_json::json;

use weather_bot::activity::{Activity, ActivityKind, ChannelAccount};
use weather_bot::bot_runtime::BotRuntime;
use weather_bot::config::{BotKind, Config, StorageBackend};

const CONVERSATION: &str = "conv-1";

fn user() -> ChannelAccount {
    ChannelAccount::new("user-1", Some("Ada"))
}

fn bot() -> ChannelAccount {
    ChannelAccount::new("weather", Some("weather"))
}

fn say(text: &str) -> Activity {
    Activity::message("test", CONVERSATION, user(), bot(), text)
}

async fn texts(runtime: &BotRuntime, text: &str) -> Vec<String> {
    runtime
        .process(say(text))
        .await
        .unwrap()
        .iter()
        .map(|a| a.text().to_string())
        .collect()
}

async fn onboard(runtime: &BotRuntime) {
    texts(runtime, "what is the weather like").await;
    texts(runtime, "Ada").await;
    let replies = texts(runtime, "Seattle").await;
    assert!(replies[0].starts_with("Ok, Ada, I'll remember that you are located in Seattle, WA."));
}

#[tokio::test]
async fn first_question_is_answered_after_onboarding() {
    let tmp = tempfile::tempdir().unwrap();
    let runtime = BotRuntime::from_config(&Config::offline(BotKind::Weather, tmp.path())).unwrap();

    assert_eq!(
        texts(&runtime, "what is the weather like").await,
        vec!["It looks like this is your first time here. What should I call you?"]
    );
    assert_eq!(texts(&runtime, "  ").await, vec!["Sorry, what should I call you?"]);
    assert_eq!(texts(&runtime, "Ada").await, vec!["Ok Ada, where are you located?"]);

    let replies = texts(&runtime, "Seattle").await;
    assert_eq!(replies.len(), 2);
    assert!(replies[1].starts_with("The current conditions in Seattle, WA are "), "{}", replies[1]);
}

#[tokio::test]
async fn named_place_overrides_saved_location() {
    let tmp = tempfile::tempdir().unwrap();
    let runtime = BotRuntime::from_config(&Config::offline(BotKind::Weather, tmp.path())).unwrap();
    onboard(&runtime).await;

    let replies = texts(&runtime, "what's the weather in Boston tomorrow").await;
    assert!(replies[0].starts_with("The weather in Boston, MA tomorrow will be "), "{}", replies[0]);

    let replies = texts(&runtime, "what's the high today").await;
    assert!(replies[0].starts_with("The high temperature today in Seattle, WA is "), "{}", replies[0]);
}

#[tokio::test]
async fn location_command_saves_device_location() {
    let tmp = tempfile::tempdir().unwrap();
    let runtime = BotRuntime::from_config(&Config::offline(BotKind::Weather, tmp.path())).unwrap();

    let replies = runtime.process(say("/location:[42.361145, -71.057083]")).await.unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].kind, ActivityKind::Event);
    assert_eq!(replies[0].value_type.as_deref(), Some("location.saved"));
    assert_eq!(replies[0].value, None);

    // Known user with a location skips onboarding.
    let replies = texts(&runtime, "will it snow").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("Boston, MA"), "{}", replies[0]);
}

#[tokio::test]
async fn reset_command_starts_over() {
    let tmp = tempfile::tempdir().unwrap();
    let runtime = BotRuntime::from_config(&Config::offline(BotKind::Weather, tmp.path())).unwrap();
    onboard(&runtime).await;

    assert_eq!(texts(&runtime, "/reset").await, vec!["State has been reset"]);
    assert_eq!(
        texts(&runtime, "is it sunny").await,
        vec!["It looks like this is your first time here. What should I call you?"]
    );
}

#[tokio::test]
async fn file_storage_remembers_user_across_restarts() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = Config::offline(BotKind::Weather, tmp.path());
    config.storage = StorageBackend::File;

    {
        let runtime = BotRuntime::from_config(&config).unwrap();
        onboard(&runtime).await;
    }

    let runtime = BotRuntime::from_config(&config).unwrap();
    let replies = texts(&runtime, "is it foggy").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("foggy today in Seattle, WA"), "{}", replies[0]);
}

#[tokio::test]
async fn unknown_coordinates_event() {
    let tmp = tempfile::tempdir().unwrap();
    let runtime = BotRuntime::from_config(&Config::offline(BotKind::Weather, tmp.path())).unwrap();

    let event = Activity::event("test", CONVERSATION, user(), bot(), "location", Some(json!([-60.0, 0.0])));
    let replies = runtime.process(event).await.unwrap();
    assert_eq!(replies[0].value_type.as_deref(), Some("location.notFound"));
}
