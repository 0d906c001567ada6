//! Filesystem actor.
//!
//! Watches the source tree and sends classified events to the builder.
//! The watcher is started before the initial build ("watcher first"), so
//! edits made while that build runs are buffered instead of lost.
//!
//! ```text
//! notify → Debouncer (timing, merge) → EventClassifier (disk, ignore) → BuilderMsg
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use super::builder::TrackedFiles;
use super::messages::BuilderMsg;
use crate::config::Options;

// Disk reconciliation and relevance filtering.
mod classifier;
// Pure timing and deduplication.
mod debouncer;
// Shared event types.
mod types;
// Watch root attach/re-attach.
mod watch_roots;


use classifier::EventClassifier;
use debouncer::Debouncer;
use watch_roots::WatchRoots;

pub struct FsActor {
    /// Sync channel fed by the notify callback
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Must stay alive for events to flow
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    builder_tx: mpsc::Sender<BuilderMsg>,
    debouncer: Debouncer,
    options: Arc<Options>,
    tracked: TrackedFiles,
}

impl FsActor {
    /// Start watching `paths` immediately; events buffer until `run`.
    pub fn new(
        paths: Vec<PathBuf>,
        builder_tx: mpsc::Sender<BuilderMsg>,
        options: Arc<Options>,
        tracked: TrackedFiles,
    ) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut watch_roots = WatchRoots::new(paths);
        watch_roots.attach_existing(&mut watcher)?;

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            builder_tx,
            debouncer: Debouncer::new(),
            options,
            tracked,
        })
    }

    /// Event loop. Returns when the builder is gone.
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_roots,
            builder_tx,
            mut debouncer,
            options,
            tracked,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // notify delivers on a std channel; bridge it into tokio
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => debouncer.add_event(&event),
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    watch_roots.maintain(&mut watcher);
                    if flush(&mut debouncer, &builder_tx, &options, &tracked).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

/// Classify ready changes and forward them.
///
/// Returns `Err(())` once the builder has shut down.
async fn flush(
    debouncer: &mut Debouncer,
    builder_tx: &mpsc::Sender<BuilderMsg>,
    options: &Options,
    tracked: &TrackedFiles,
) -> Result<(), ()> {
    let Some(raw) = debouncer.take_if_ready() else {
        return Ok(());
    };

    let classified = {
        let tracked = tracked.read();
        EventClassifier::classify(raw, options, &tracked)
    };
    let Some(events) = classified else {
        return Ok(());
    };

    let events = events.into_events();
    for event in &events {
        crate::debug!("watch"; "{}: {}", event.kind.label(), options.display_path(&event.path));
    }

    builder_tx
        .send(BuilderMsg::Events(events))
        .await
        .map_err(|_| ())
}
