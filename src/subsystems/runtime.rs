//! Component runtime — runs channel tasks side by side under one shutdown token.
//!
//! A [`Component`] captures whatever shared state it needs when it is built
//! and only receives the shutdown token when spawned. [`spawn_components`]
//! puts each one on a [`JoinSet`]; the first failure cancels the token so the
//! others wind down, and the returned [`SubsystemHandle`] yields that error.

use std::future::Future;
use std::pin::Pin;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::AppError;

// ── Component ─────────────────────────────────────────────────────────────────

pub type ComponentFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

pub trait Component: Send + 'static {
    /// Used in log lines.
    fn id(&self) -> &str;

    /// Run until `shutdown` fires or the component has nothing left to do.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture;
}

// ── SubsystemHandle ───────────────────────────────────────────────────────────

pub struct SubsystemHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl SubsystemHandle {
    /// Wrap a task that already supervises its own components.
    pub fn spawn<F>(task: F) -> Self
    where
        F: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        Self { inner: tokio::spawn(task) }
    }

    /// Wait for every component and return the first error.
    pub async fn join(self) -> Result<(), AppError> {
        match self.inner.await {
            Ok(r) => r,
            Err(e) => Err(AppError::Comms(format!("component task panicked: {e}"))),
        }
    }
}

// ── spawn_components ──────────────────────────────────────────────────────────

pub fn spawn_components(components: Vec<Box<dyn Component>>, shutdown: CancellationToken) -> SubsystemHandle {
    let handle = tokio::spawn(async move {
        let mut set: JoinSet<Result<(), AppError>> = JoinSet::new();

        for component in components {
            debug!(component = component.id(), "spawning component");
            set.spawn(component.run(shutdown.clone()));
        }

        let mut first_err: Option<AppError> = None;
        while let Some(res) = set.join_next().await {
            match res {
                Err(e) => {
                    error!("component panicked: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert_with(|| AppError::Comms(format!("component panicked: {e}")));
                }
                Ok(Err(e)) => {
                    error!("component failed: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert(e);
                }
                Ok(Ok(())) => {}
            }
        }

        first_err.map_or(Ok(()), Err)
    });

    SubsystemHandle { inner: handle }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Finishes(&'static str, Result<(), &'static str>);

    impl Component for Finishes {
        fn id(&self) -> &str {
            self.0
        }

        fn run(self: Box<Self>, _shutdown: CancellationToken) -> ComponentFuture {
            let result = self.1.map_err(|m| AppError::Comms(m.into()));
            Box::pin(async move { result })
        }
    }

    struct WaitsForShutdown;

    impl Component for WaitsForShutdown {
        fn id(&self) -> &str {
            "waiter"
        }

        fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async move {
                shutdown.cancelled().await;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn no_components_is_ok() {
        assert!(spawn_components(Vec::new(), CancellationToken::new()).join().await.is_ok());
    }

    #[tokio::test]
    async fn failure_cancels_siblings() {
        let shutdown = CancellationToken::new();
        let handle = spawn_components(
            vec![Box::new(WaitsForShutdown), Box::new(Finishes("bad", Err("bind failed")))],
            shutdown.clone(),
        );
        let err = handle.join().await.unwrap_err();
        assert!(err.to_string().contains("bind failed"));
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn clean_exit_leaves_token_alone() {
        let shutdown = CancellationToken::new();
        spawn_components(vec![Box::new(Finishes("ok", Ok(())))], shutdown.clone())
            .join()
            .await
            .unwrap();
        assert!(!shutdown.is_cancelled());
    }
}
