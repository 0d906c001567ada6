use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

/// Keeps the source root watched.
///
/// A root that is deleted and recreated loses its watch handle; `maintain`
/// re-attaches it once it exists again.
pub(super) struct WatchRoots {
    roots: Vec<(PathBuf, bool)>,
}

impl WatchRoots {
    pub(super) fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            roots: paths.into_iter().map(|path| (path, false)).collect(),
        }
    }

    /// Attach every root that exists now. Missing roots are retried later.
    pub(super) fn attach_existing(&mut self, watcher: &mut RecommendedWatcher) -> notify::Result<()> {
        for (path, attached) in &mut self.roots {
            if path.exists() {
                watcher.watch(path, RecursiveMode::Recursive)?;
                *attached = true;
            }
        }
        Ok(())
    }

    pub(super) fn maintain(&mut self, watcher: &mut RecommendedWatcher) {
        for (path, attached) in &mut self.roots {
            if !path.exists() {
                *attached = false;
                continue;
            }
            if !*attached && watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                *attached = true;
                crate::debug!("watch"; "re-attached {}", path.display());
            }
        }
    }
}
