//! Builder actor.
//!
//! Sole owner of the [`Engine`] while watching. Each batch runs on the
//! blocking pool so the runtime keeps receiving filesystem events; batches
//! never overlap because the engine is moved into the task and back.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use tokio::sync::mpsc;

use super::messages::BuilderMsg;
use crate::cli::build::{Summary, log_artifacts};
use crate::engine::{BuildError, BuildReport, Engine, WatchEvent};
use crate::logger::{status_detach, status_error, status_success};

/// Source files the engine currently knows, shared with the classifier.
pub type TrackedFiles = Arc<RwLock<FxHashSet<PathBuf>>>;

/// Existing registry paths.
pub fn tracked_snapshot(engine: &Engine) -> FxHashSet<PathBuf> {
    engine
        .registry()
        .iter()
        .filter(|file| file.exists)
        .map(|file| file.path.clone())
        .collect()
}

pub struct BuilderActor {
    rx: mpsc::Receiver<BuilderMsg>,
    engine: Option<Engine>,
    tracked: TrackedFiles,
}

impl BuilderActor {
    pub fn new(rx: mpsc::Receiver<BuilderMsg>, engine: Engine, tracked: TrackedFiles) -> Self {
        *tracked.write() = tracked_snapshot(&engine);
        Self {
            rx,
            engine: Some(engine),
            tracked,
        }
    }

    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                BuilderMsg::Events(events) => {
                    if !self.handle_events(events).await {
                        break;
                    }
                }
                BuilderMsg::Shutdown => {
                    crate::debug!("builder"; "shutdown");
                    break;
                }
            }
        }

        if let Some(engine) = self.engine.take() {
            engine.shutdown();
        }
    }

    /// Returns `false` when the engine was lost to a panicked task.
    async fn handle_events(&mut self, events: Vec<WatchEvent>) -> bool {
        let Some(mut engine) = self.engine.take() else {
            return false;
        };

        let task = tokio::task::spawn_blocking(move || {
            let results = process_batch(&mut engine, &events);
            (engine, events, results)
        });

        match task.await {
            Ok((engine, events, results)) => {
                *self.tracked.write() = tracked_snapshot(&engine);
                report(&engine, &events, &results);
                self.engine = Some(engine);
                true
            }
            Err(e) => {
                crate::log!("builder"; "build task failed: {}", e);
                false
            }
        }
    }
}

/// Apply events in order, collecting every package result.
pub(super) fn process_batch(
    engine: &mut Engine,
    events: &[WatchEvent],
) -> Vec<Result<BuildReport, BuildError>> {
    let mut results = Vec::new();
    for event in events {
        crate::debug!("builder"; "{} {}", event.kind.label(), engine.options().display_path(&event.path));
        results.extend(engine.handle_event(event));
    }
    results
}

fn report(engine: &Engine, events: &[WatchEvent], results: &[Result<BuildReport, BuildError>]) {
    let options = engine.options();
    let summary = Summary::collect(results, options);
    if log_artifacts(results, options) {
        status_detach();
    }

    if let Some(detail) = summary.error_detail() {
        status_error(&summary.failure_line(), &detail);
        return;
    }

    let trigger = match events {
        [event] => options.display_path(&event.path),
        _ => crate::utils::plural::plural_count(events.len(), "change"),
    };
    status_success(&format!("{trigger}: {}", summary.message()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ChangeKind;
    use crate::plugin::PluginRegistry;
    use crate::config::Options;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> Engine {
        let options = Options {
            source: dir.path().join("src"),
            destination: dir.path().join("dist"),
            hashed: false,
            ..Options::default()
        };
        std::fs::create_dir_all(&options.source).unwrap();
        let plugins = PluginRegistry::with_defaults(&options);
        Engine::new(options, plugins)
    }

    #[test]
    fn test_tracked_snapshot_skips_removed_files() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        let a = dir.path().join("src/a.css");
        let b = dir.path().join("src/b.css");
        std::fs::write(&a, "a{}").unwrap();
        std::fs::write(&b, "b{}").unwrap();
        engine.index().unwrap();

        std::fs::remove_file(&b).unwrap();
        engine.index().unwrap();

        let tracked = tracked_snapshot(&engine);
        assert!(tracked.contains(&a));
        assert!(!tracked.contains(&b));
    }

    #[test]
    fn test_process_batch_in_order() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        let old = dir.path().join("src/old.txt");
        std::fs::write(&old, "x").unwrap();
        engine.index().unwrap();
        engine.build_all();

        let new = dir.path().join("src/new.txt");
        std::fs::rename(&old, &new).unwrap();
        let results = process_batch(
            &mut engine,
            &[
                WatchEvent::new(ChangeKind::Removed, &old),
                WatchEvent::new(ChangeKind::Created, &new),
            ],
        );

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Result::is_ok));
        assert!(!dir.path().join("dist/old.txt").exists());
        assert!(dir.path().join("dist/new.txt").is_file());
    }

    #[tokio::test]
    async fn test_actor_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let tracked = TrackedFiles::default();
        let (tx, rx) = mpsc::channel(4);

        let actor = BuilderActor::new(rx, engine, tracked.clone());
        let handle = tokio::spawn(actor.run());
        tx.send(BuilderMsg::Shutdown).await.unwrap();
        handle.await.unwrap();
    }
}
