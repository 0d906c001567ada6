use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use rustc_hash::{FxHashMap, FxHashSet};

use super::types::DebouncedEvents;
use crate::config::Options;
use crate::engine::ChangeKind;
use crate::utils::path::normalize_path;

/// Turns debounced raw changes into events the engine can act on.
///
/// Pipeline: reconcile with disk → expand directory events → keep relevant.
pub(super) struct EventClassifier;

impl EventClassifier {
    /// `tracked` holds the source files the engine currently knows.
    pub(super) fn classify(
        raw: FxHashMap<PathBuf, ChangeKind>,
        options: &Options,
        tracked: &FxHashSet<PathBuf>,
    ) -> Option<DebouncedEvents> {
        let mut changes = raw;

        Self::reconcile_with_disk(&mut changes);
        Self::expand_directories(&mut changes, tracked);
        Self::retain_relevant(&mut changes, options, tracked);

        (!changes.is_empty()).then(|| DebouncedEvents(changes.into_iter().collect()))
    }

    /// Watchers report stale kinds (a create for a file already gone, a
    /// remove for a file an atomic save put back). Disk state wins.
    pub(super) fn reconcile_with_disk(changes: &mut FxHashMap<PathBuf, ChangeKind>) {
        changes.retain(|path, kind| {
            let exists = path.exists();
            let current = *kind;
            match current {
                ChangeKind::Created if !exists => {
                    crate::debug!("watch"; "discard created (gone): {}", path.display());
                    return false;
                }
                ChangeKind::Modified if !exists => *kind = ChangeKind::Removed,
                ChangeKind::Removed if exists => *kind = ChangeKind::Modified,
                _ => {}
            }
            true
        });
    }

    /// Derive file events from directory events.
    ///
    /// kqueue and FSEvents may only report a directory modification after a
    /// file inside was replaced, and a directory moved into the tree arrives
    /// as a single create.
    fn expand_directories(changes: &mut FxHashMap<PathBuf, ChangeKind>, tracked: &FxHashSet<PathBuf>) {
        let dirs: Vec<(PathBuf, ChangeKind)> = changes
            .iter()
            .filter(|(path, kind)| **kind != ChangeKind::Removed && path.is_dir())
            .map(|(path, kind)| (path.clone(), *kind))
            .collect();

        for (dir, kind) in dirs {
            if kind == ChangeKind::Modified {
                for source in tracked.iter().filter(|t| t.parent() == Some(dir.as_path())) {
                    if !source.exists() && !changes.contains_key(source) {
                        crate::debug!("watch"; "dir-scan found missing: {}", source.display());
                        changes.insert(source.clone(), ChangeKind::Removed);
                    }
                }
            }

            let depth = if kind == ChangeKind::Created { usize::MAX } else { 1 };
            for path in files_under(&dir, depth) {
                if !tracked.contains(&path) && !changes.contains_key(&path) {
                    crate::debug!("watch"; "dir-scan found untracked: {}", path.display());
                    changes.insert(path, ChangeKind::Created);
                }
            }
        }
    }

    /// Keep events for files inside the source tree that are neither
    /// ignored nor part of the destination tree.
    pub(super) fn retain_relevant(
        changes: &mut FxHashMap<PathBuf, ChangeKind>,
        options: &Options,
        tracked: &FxHashSet<PathBuf>,
    ) {
        changes.retain(|path, kind| {
            if path.starts_with(&options.destination) {
                return false;
            }
            let Ok(location) = path.strip_prefix(&options.source) else {
                return false;
            };
            if options.is_ignored(location) {
                crate::debug!("watch"; "ignored: {}", path.display());
                return false;
            }
            match kind {
                ChangeKind::Created | ChangeKind::Modified => path.is_file(),
                // A removed directory covers the tracked files below it
                ChangeKind::Removed => {
                    tracked.contains(path) || tracked.iter().any(|t| t.starts_with(path.as_path()))
                }
            }
        });
    }
}

fn files_under(dir: &Path, depth: usize) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .max_depth(depth)
        .skip_hidden(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| normalize_path(&e.path()))
        .collect()
}
