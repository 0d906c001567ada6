//! Actor coordinator.
//!
//! Creates the channel, starts the watcher before the initial build so no
//! edit made during that build is missed, then runs both actors until the
//! shutdown signal arrives or one of them stops.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::builder::{BuilderActor, TrackedFiles, tracked_snapshot};
use super::fs::FsActor;
use super::messages::BuilderMsg;
use crate::engine::Engine;

const CHANNEL_BUFFER: usize = 32;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct Coordinator {
    engine: Engine,
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    /// `engine` must already be indexed.
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            shutdown_rx: None,
        }
    }

    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            engine,
            shutdown_rx,
        } = self;
        let (builder_tx, builder_rx) = mpsc::channel::<BuilderMsg>(CHANNEL_BUFFER);

        let options = Arc::new(engine.options().clone());
        let tracked: TrackedFiles = Arc::new(parking_lot::RwLock::new(tracked_snapshot(&engine)));
        let fs_actor = FsActor::new(
            vec![options.source.clone()],
            builder_tx.clone(),
            options.clone(),
            tracked.clone(),
        )
        .map_err(|e| anyhow!("watcher failed: {}", e))?;

        // Initial build on the blocking pool; the watcher is already buffering
        let engine = tokio::task::spawn_blocking(move || {
            let results = engine.build_all();
            crate::cli::build::report(&results, engine.options());
            engine
        })
        .await
        .map_err(|e| anyhow!("initial build failed: {}", e))?;

        let builder = BuilderActor::new(builder_rx, engine, tracked);

        crate::log!("watch"; "watching {}", options.display_path(&options.source));
        let fs_handle = tokio::spawn(fs_actor.run());
        let mut builder_handle = tokio::spawn(builder.run());

        match shutdown_rx {
            Some(rx) => loop {
                if rx.try_recv().is_ok() || crate::core::is_shutdown() {
                    crate::debug!("actor"; "shutdown signal received");
                    break;
                }
                if builder_handle.is_finished() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            },
            None => {
                tokio::select! {
                    _ = fs_handle => {}
                    _ = &mut builder_handle => return Ok(()),
                }
            }
        }

        let _ = builder_tx.send(BuilderMsg::Shutdown).await;
        if tokio::time::timeout(SHUTDOWN_GRACE, builder_handle).await.is_err() {
            crate::log!("watch"; "builder did not stop in time");
        }
        crate::debug!("actor"; "stopped");
        Ok(())
    }
}
