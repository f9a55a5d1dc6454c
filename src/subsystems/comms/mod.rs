//! Comms subsystem — the channels users talk to the bot through.
//!
//! Each channel (console, HTTP) is a [`Component`] holding an
//! `Arc<CommsState>`. [`start`] builds the ones the config enables, spawns
//! them, and folds their [`CommsEvent`]s into a [`SessionTally`] that is
//! logged once every channel has stopped.

#[cfg(feature = "channel-axum")]
pub mod axum_channel;
#[cfg(feature = "channel-pty")]
pub mod pty;
mod state;

pub use state::{ChannelTally, CommsEvent, CommsState, SessionTally};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bot_runtime::BotRuntime;
use crate::config::Config;
use crate::subsystems::runtime::{Component, SubsystemHandle, spawn_components};

/// How long to wait for the event drain after the channels stop.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Spawn the configured channels. Returns as soon as they are running.
pub fn start(config: &Config, runtime: Arc<BotRuntime>, shutdown: CancellationToken) -> SubsystemHandle {
    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(32);
    let state = Arc::new(CommsState::new(runtime, event_tx));

    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    {
        if config.comms_pty_should_load() {
            info!("loading pty channel");
            components.push(Box::new(pty::PtyChannel::new(
                "pty0",
                config.comms.pty.user_name.clone(),
                state.clone(),
            )));
        }
    }

    #[cfg(feature = "channel-axum")]
    {
        if config.comms_http_should_load() {
            info!(bind = %config.comms.http.bind, "loading http channel");
            components.push(Box::new(axum_channel::AxumChannel::new(
                "http0",
                config.comms.http.bind.clone(),
                state.clone(),
            )));
        }
    }

    if components.is_empty() {
        warn!("no comms channels enabled; exiting");
    }
    drop(state);

    let drain = tokio::spawn(drain_events(event_rx));
    let channels = spawn_components(components, shutdown);

    SubsystemHandle::spawn(async move {
        let result = channels.join().await;
        match tokio::time::timeout(DRAIN_GRACE, drain).await {
            Ok(Ok(tally)) => tally.log_summary(),
            Ok(Err(e)) => warn!("comms event drain panicked: {e}"),
            Err(_) => warn!("comms event drain still open after channels stopped"),
        }
        result
    })
}

/// Fold events until every sender is gone.
pub async fn drain_events(mut rx: mpsc::Receiver<CommsEvent>) -> SessionTally {
    let mut tally = SessionTally::default();
    while let Some(event) = rx.recv().await {
        debug!(?event, "comms event");
        tally.record(event);
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(channel_id: &str, conversation_id: &str, failed: bool) -> CommsEvent {
        CommsEvent::TurnCompleted { channel_id: channel_id.into(), conversation_id: conversation_id.into(), failed }
    }

    #[tokio::test]
    async fn drain_counts_sessions_per_channel() {
        let (tx, rx) = mpsc::channel(16);
        tx.send(CommsEvent::SessionStarted { channel_id: "pty0".into(), conversation_id: "c1".into() })
            .await
            .unwrap();
        tx.send(turn("pty0", "c1", false)).await.unwrap();
        tx.send(turn("pty0", "c1", true)).await.unwrap();
        tx.send(turn("http0", "a", false)).await.unwrap();
        tx.send(turn("http0", "b", false)).await.unwrap();
        tx.send(CommsEvent::ChannelShutdown { channel_id: "pty0".into() }).await.unwrap();
        drop(tx);

        let tally = drain_events(rx).await;
        let pty = tally.channel("pty0").unwrap();
        assert_eq!(pty.conversations.len(), 1);
        assert_eq!(pty.turns, 2);
        assert_eq!(pty.failed_turns, 1);
        assert!(pty.shut_down);

        let http = tally.channel("http0").unwrap();
        assert_eq!(http.conversations.len(), 2);
        assert!(!http.shut_down);
        assert_eq!(tally.total_turns(), 4);
        assert!(tally.channel("telegram").is_none());
    }

    #[tokio::test]
    async fn start_without_channels_finishes() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::offline(crate::config::BotKind::Echo, tmp.path());
        let runtime = Arc::new(BotRuntime::from_config(&config).unwrap());
        start(&config, runtime, CancellationToken::new()).join().await.unwrap();
    }
}
