use std::path::PathBuf;

use crate::engine::{ChangeKind, WatchEvent};

/// Classified changes ready for the builder.
pub(super) struct DebouncedEvents(pub(super) Vec<(PathBuf, ChangeKind)>);

impl DebouncedEvents {
    /// Removals first so a rename (remove + create) frees the old artifacts
    /// before the new file is built; then creations, then modifications.
    pub(super) fn into_events(mut self) -> Vec<WatchEvent> {
        self.0
            .sort_by(|a, b| rank(a.1).cmp(&rank(b.1)).then_with(|| a.0.cmp(&b.0)));
        self.0
            .into_iter()
            .map(|(path, kind)| WatchEvent::new(kind, path))
            .collect()
    }
}

fn rank(kind: ChangeKind) -> u8 {
    match kind {
        ChangeKind::Removed => 0,
        ChangeKind::Created => 1,
        ChangeKind::Modified => 2,
    }
}
