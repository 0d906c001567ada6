//! In-memory file registry.
//!
//! Ordered by absolute path so iteration (and anything derived from it, such
//! as shared-dependency ownership) is deterministic.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use rustc_hash::FxHashSet;

use super::file::File;
use crate::config::Options;

#[derive(Debug, Default)]
pub struct Registry {
    files: BTreeMap<PathBuf, File>,
}

/// Outcome of a scan, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub appended: usize,
    pub updated: usize,
    pub removed: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<&File> {
        self.files.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut File> {
        self.files.get_mut(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn iter(&self) -> btree_map::Values<'_, PathBuf, File> {
        self.files.values()
    }

    pub fn iter_mut(&mut self) -> btree_map::ValuesMut<'_, PathBuf, File> {
        self.files.values_mut()
    }

    pub(crate) fn map(&self) -> &BTreeMap<PathBuf, File> {
        &self.files
    }

    /// Insert a freshly read file, replacing any previous entry.
    pub fn append(&mut self, path: &Path, root: &Path) -> &File {
        let file = File::read(path, root);
        self.files.insert(path.to_path_buf(), file);
        &self.files[path]
    }

    /// Re-read a known file (or append an unknown one).
    ///
    /// Returns whether the checksum changed.
    pub fn update(&mut self, path: &Path, root: &Path) -> bool {
        match self.files.get_mut(path) {
            Some(file) => {
                let was_missing = !file.exists;
                let changed = file.refresh();
                changed || (was_missing && file.exists)
            }
            None => {
                self.append(path, root);
                true
            }
        }
    }

    /// Soft delete. Unknown paths are ignored.
    pub fn remove(&mut self, path: &Path) {
        if let Some(file) = self.files.get_mut(path) {
            file.mark_removed();
        }
    }

    /// Scan `dir` (inside `root`) and sync the registry with disk.
    ///
    /// Unseen files are appended, known files updated, and previously
    /// existing files under `dir` that are gone are soft-removed. Files
    /// matching `ignore` and anything under the destination root are skipped.
    pub fn index_tree(&mut self, root: &Path, dir: &Path, options: &Options) -> ScanStats {
        let mut stats = ScanStats::default();
        let mut seen = FxHashSet::default();

        let found: Vec<PathBuf> = WalkDir::new(dir)
            .skip_hidden(false)
            .sort(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path())
            .filter(|p| !p.starts_with(&options.destination))
            .filter(|p| !options.is_ignored(p.strip_prefix(root).unwrap_or(p)))
            .collect();

        for path in found {
            if self.files.contains_key(&path) {
                self.update(&path, root);
                stats.updated += 1;
            } else {
                self.append(&path, root);
                stats.appended += 1;
            }
            seen.insert(path);
        }

        for file in self.files.values_mut() {
            if file.exists && file.path.starts_with(dir) && !seen.contains(&file.path) {
                file.mark_removed();
                stats.removed += 1;
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options(dir: &TempDir) -> Options {
        Options {
            source: dir.path().join("src"),
            destination: dir.path().join("dist"),
            ..Default::default()
        }
    }

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_index_tree_appends_all_files() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir);
        write(&opts.source, "css/app.css", "a{}");
        write(&opts.source, "js/app.js", "x");
        write(&opts.source, ".well-known/security.txt", "y");

        let mut registry = Registry::new();
        let stats = registry.index_tree(&opts.source, &opts.source, &opts);

        assert_eq!(stats.appended, 3);
        assert_eq!(registry.len(), 3);
        assert!(registry.contains(&opts.source.join("css/app.css")));
    }

    #[test]
    fn test_index_tree_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir);
        let path = write(&opts.source, "app.js", "one");

        let mut registry = Registry::new();
        registry.index_tree(&opts.source, &opts.source, &opts);
        let before = registry.get(&path).unwrap().clone();

        let stats = registry.index_tree(&opts.source, &opts.source, &opts);
        let after = registry.get(&path).unwrap();

        assert_eq!(stats.appended, 0);
        assert_eq!(after.checksum, before.checksum);
        assert_eq!(after.previous, before.previous);
    }

    #[test]
    fn test_index_tree_skips_ignored() {
        let dir = TempDir::new().unwrap();
        let mut opts = options(&dir);
        opts.ignore.extend(["*.md", "drafts/**"]);
        write(&opts.source, "README.md", "#");
        write(&opts.source, "drafts/a.css", "a{}");
        write(&opts.source, "b.css", "b{}");

        let mut registry = Registry::new();
        registry.index_tree(&opts.source, &opts.source, &opts);

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&opts.source.join("b.css")));
    }

    #[test]
    fn test_update_tracks_previous() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir);
        let path = write(&opts.source, "app.css", "a{}");

        let mut registry = Registry::new();
        registry.append(&path, &opts.source);
        let first = registry.get(&path).unwrap().checksum.clone();

        fs::write(&path, "b{}").unwrap();
        assert!(registry.update(&path, &opts.source));
        assert_eq!(registry.get(&path).unwrap().previous, first);
    }

    #[test]
    fn test_scoped_index_soft_removes_vanished() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir);
        let keep = write(&opts.source, "css/keep.css", "a{}");
        let gone = write(&opts.source, "css/gone.css", "b{}");
        let other = write(&opts.source, "js/other.js", "c");

        let mut registry = Registry::new();
        registry.index_tree(&opts.source, &opts.source, &opts);

        fs::remove_file(&gone).unwrap();
        fs::remove_file(&other).unwrap();
        let stats = registry.index_tree(&opts.source, &opts.source.join("css"), &opts);

        assert_eq!(stats.removed, 1);
        assert!(registry.get(&keep).unwrap().exists);
        assert!(!registry.get(&gone).unwrap().exists);
        // Outside the scanned directory: untouched
        assert!(registry.get(&other).unwrap().exists);
    }

    #[test]
    fn test_remove_is_soft_and_idempotent() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir);
        let path = write(&opts.source, "app.js", "x");

        let mut registry = Registry::new();
        registry.append(&path, &opts.source);
        registry.remove(&path);
        registry.remove(&path);
        registry.remove(&opts.source.join("unknown.js"));

        let file = registry.get(&path).unwrap();
        assert!(!file.exists);
        assert!(!file.checksum.is_empty());
        assert_eq!(registry.len(), 1);
    }
}
