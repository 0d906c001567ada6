//! Author-written reference resolution.
//!
//! References inside source files are usually relative, sometimes
//! extensionless (`@import "base"`), and sometimes root-absolute
//! (`<script src="/js/app.js">`). Resolution searches the filesystem from the
//! referencing file's folder upwards until the source root.

use std::path::{Component, Path, PathBuf};

use super::fs::clean_path;

/// Resolve `reference` to an existing file.
///
/// Probes `start_dir` and then each ancestor up to (and including) `root`,
/// first for `reference` itself, then for `reference + ext` for every
/// candidate extension. A reference starting with `/` is resolved against
/// `root` only.
///
/// Returns the first existing file. When nothing matches, returns the
/// reference joined to `start_dir` (or `root` for absolute references),
/// which callers treat as a dangling target.
pub fn resolve_reference(
    reference: &str,
    extensions: &[&str],
    start_dir: &Path,
    root: &Path,
) -> PathBuf {
    let reference = reference.trim();

    if let Some(absolute) = reference.strip_prefix('/') {
        return find_in(root, absolute, extensions).unwrap_or_else(|| clean_path(&root.join(absolute)));
    }

    let mut dir = Some(start_dir);
    while let Some(current) = dir {
        if let Some(found) = find_in(current, reference, extensions) {
            return found;
        }
        if current == root || !current.starts_with(root) {
            break;
        }
        dir = current.parent();
    }

    clean_path(&start_dir.join(reference))
}

fn find_in(dir: &Path, reference: &str, extensions: &[&str]) -> Option<PathBuf> {
    let base = clean_path(&dir.join(reference));
    if base.is_file() {
        return Some(base);
    }
    extensions.iter().find_map(|ext| {
        let mut candidate = base.clone().into_os_string();
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        candidate.is_file().then_some(candidate)
    })
}

/// Path of `target` relative to the directory `from`, using `..` as needed.
///
/// Both paths are expected to be absolute and lexically clean.
pub fn relative_to(target: &Path, from: &Path) -> PathBuf {
    let target: Vec<Component<'_>> = target.components().collect();
    let from: Vec<Component<'_>> = from.components().collect();

    let common = target
        .iter()
        .zip(from.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &target[common..] {
        out.push(component.as_os_str());
    }
    out
}
