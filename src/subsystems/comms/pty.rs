//! Console channel — one conversation on stdin/stdout.
//!
//! On start the user is announced to the bot as a joined member, so the
//! welcome text shows up before the first prompt. Each non-empty line becomes
//! a message; `/location:[lat, lon]` and `/reset` reach the bot as events.
//! Runs until Ctrl-C or EOF.

use std::io::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{CommsEvent, CommsState};
use crate::activity::{Activity, ActivityKind, ChannelAccount};
use crate::error::AppError;
use crate::subsystems::runtime::{Component, ComponentFuture};

const CHANNEL: &str = "pty";
const USER_ID: &str = "pty-user";

// ── PtyChannel ───────────────────────────────────────────────────────────────

pub struct PtyChannel {
    channel_id: String,
    user_name: String,
    state: Arc<CommsState>,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>, user_name: impl Into<String>, state: Arc<CommsState>) -> Self {
        Self { channel_id: channel_id.into(), user_name: user_name.into(), state }
    }
}

impl Component for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_pty(self.channel_id, self.user_name, self.state, shutdown))
    }
}

// ── run_pty ──────────────────────────────────────────────────────────────────

async fn run_pty(
    channel_id: String,
    user_name: String,
    state: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let conversation_id = uuid::Uuid::new_v4().to_string();
    let user = ChannelAccount::new(USER_ID, Some(&user_name));
    let bot = ChannelAccount::new(state.bot_id(), Some(state.bot_id()));

    info!(%channel_id, %conversation_id, "pty channel started");
    state.report_event(CommsEvent::SessionStarted {
        channel_id: channel_id.clone(),
        conversation_id: conversation_id.clone(),
    });
    println!("─────────────────────────────────");
    println!(" {} bot console  (Ctrl-C to quit)", state.bot_id());
    println!("─────────────────────────────────");

    let joined = Activity::members_added(CHANNEL, &conversation_id, user.clone(), bot.clone(), vec![user.clone()]);
    print_replies(&state.process(joined).await?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                println!();
                info!("pty channel shutting down");
                break;
            }

            line = lines.next_line() => {
                let input = match line {
                    Err(e) => {
                        warn!("pty read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!("pty stdin closed");
                        break;
                    }
                    Ok(Some(input)) => input.trim().to_string(),
                };
                if input.is_empty() {
                    continue;
                }
                debug!(%input, "pty received line");

                let message = Activity::message(CHANNEL, &conversation_id, user.clone(), bot.clone(), input);
                let result = state.process(message).await;
                state.report_event(CommsEvent::TurnCompleted {
                    channel_id: channel_id.clone(),
                    conversation_id: conversation_id.clone(),
                    failed: result.is_err(),
                });
                match result {
                    Ok(replies) => print_replies(&replies),
                    Err(e) => {
                        warn!("turn failed: {e}");
                        println!("[error] {e}");
                    }
                }
            }
        }
    }

    state.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}

fn print_replies(replies: &[Activity]) {
    for reply in replies {
        println!("{}", render(reply));
    }
}

/// Console form of one outbound activity.
fn render(activity: &Activity) -> String {
    match activity.kind {
        ActivityKind::Event => {
            let name = activity.value_type.as_deref().unwrap_or("unnamed");
            match &activity.value {
                Some(value) => format!("[event {name}] {value}"),
                None => format!("[event {name}]"),
            }
        }
        _ => activity.text().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn accounts() -> (ChannelAccount, ChannelAccount) {
        (ChannelAccount::new("u", None), ChannelAccount::new("b", None))
    }

    #[test]
    fn renders_text_and_events() {
        let (u, b) = accounts();
        let text = Activity::message(CHANNEL, "c", b.clone(), u.clone(), "\nhello\n");
        assert_eq!(render(&text), "hello");

        let saved = Activity::event(CHANNEL, "c", b.clone(), u.clone(), "location.saved", Some(json!({ "text": "hi" })));
        assert_eq!(render(&saved), r#"[event location.saved] {"text":"hi"}"#);

        let ask = Activity::event(CHANNEL, "c", b, u, "location", None);
        assert_eq!(render(&ask), "[event location]");
    }
}
