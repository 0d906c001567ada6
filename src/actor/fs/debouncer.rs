use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::EventKind;
use notify::event::ModifyKind;
use rustc_hash::FxHashMap;

use crate::engine::ChangeKind;
use crate::utils::path::normalize_path;

pub(super) const DEBOUNCE_MS: u64 = 300;
pub(super) const REBUILD_COOLDOWN_MS: u64 = 800;

/// Collects raw notify events until the tree has been quiet for
/// `DEBOUNCE_MS` and the last flush is at least `REBUILD_COOLDOWN_MS` old.
///
/// Pure timing and per-path merging; knows nothing about the engine.
pub(super) struct Debouncer {
    pub(super) pending: FxHashMap<PathBuf, ChangeKind>,
    pub(super) last_event: Option<Instant>,
    pub(super) last_flush: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self {
            pending: FxHashMap::default(),
            last_event: None,
            last_flush: None,
        }
    }

    pub(super) fn add_event(&mut self, event: &notify::Event) {
        let Some(kind) = change_kind(&event.kind) else {
            return;
        };
        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

        for path in event.paths.iter().filter(|p| !is_editor_artifact(p)) {
            let path = normalize_path(path);
            let merged = match self.pending.get(&path) {
                Some(&pending) => merge(pending, kind),
                None => Some(kind),
            };
            match merged {
                Some(kind) => {
                    self.pending.insert(path, kind);
                }
                None => {
                    crate::debug!("watch"; "discard created+removed: {}", path.display());
                    self.pending.remove(&path);
                }
            }
            self.last_event = Some(Instant::now());
        }
    }

    /// Drain pending changes once debounce and cooldown have elapsed.
    pub(super) fn take_if_ready(&mut self) -> Option<FxHashMap<PathBuf, ChangeKind>> {
        if !self.is_ready() {
            return None;
        }
        self.last_event = None;
        self.last_flush = Some(Instant::now());
        Some(std::mem::take(&mut self.pending))
    }

    pub(super) fn is_ready(&self) -> bool {
        let quiet = self
            .last_event
            .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS));
        let cooled = self
            .last_flush
            .is_none_or(|t| t.elapsed() >= Duration::from_millis(REBUILD_COOLDOWN_MS));
        quiet && cooled && !self.pending.is_empty()
    }

    /// Time until the next possible flush.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event.filter(|_| !self.pending.is_empty()) else {
            return Duration::from_secs(3600);
        };
        let debounce = Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());
        let cooldown = self.last_flush.map_or(Duration::ZERO, |t| {
            Duration::from_millis(REBUILD_COOLDOWN_MS).saturating_sub(t.elapsed())
        });
        debounce.max(cooldown).max(Duration::from_millis(1))
    }
}

fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        // mtime/chmod noise would rebuild forever
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        _ => None,
    }
}

/// Merge a pending change with a newer one for the same path.
/// `None` means the two cancel out.
fn merge(pending: ChangeKind, incoming: ChangeKind) -> Option<ChangeKind> {
    use ChangeKind::*;
    match (pending, incoming) {
        // Deleted, then restored
        (Removed, Created | Modified) => Some(incoming),
        (Modified, Removed) => Some(Removed),
        // Appeared and vanished inside one window
        (Created, Removed) => None,
        _ => Some(pending),
    }
}

/// Editor swap, backup and lock files.
pub(super) fn is_editor_artifact(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "swp" | "swo" | "swx" | "tmp" | "bak" | "bck" | "backup" | "crswap")
        || name.ends_with('~')
        || name.starts_with(".#")
        || name == "4913"
}
