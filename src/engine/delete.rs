//! Artifact deletion.
//!
//! Destination names depend on content, so the current checksum alone does
//! not say which files exist on disk. Deletion removes every variant a
//! package may have produced: the current, previous and last built
//! checksums, the unhashed name, each variant's generated siblings, and the
//! same set for conventional sibling dependencies (source maps, alternatives).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::{BuildReport, Engine, File};
use crate::utils::path::fs::remove_file;
use crate::utils::path::{to_hashed, to_non_hashed};

/// Which checksums a candidate set covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Purge {
    /// Every known checksum plus the unhashed name.
    All,
    /// Previous and last built checksums, when they differ from the current.
    Previous,
}

impl Engine {
    /// Remove every artifact `package` may have produced. Idempotent.
    pub fn delete(&self, package: &Path) -> Result<BuildReport> {
        let file = self
            .lookup(package)
            .with_context(|| format!("{} is not indexed", package.display()))?;

        let mut report = BuildReport::new(package);
        for path in self.artifact_candidates(file, Purge::All) {
            if remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))? {
                report.deleted.push(path);
            }
        }
        self.built.lock().remove(package);
        Ok(report)
    }

    /// Candidate artifact paths of `file` and its sibling dependencies.
    pub(super) fn artifact_candidates(&self, file: &File, purge: Purge) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        self.push_variants(file, purge, &mut candidates);

        for edge in file.related.iter().filter(|e| e.dependency && e.source.is_empty()) {
            if let Some(target) = self.registry.get(&edge.target) {
                self.push_variants(target, purge, &mut candidates);
            }
        }

        candidates
    }

    fn push_variants(&self, file: &File, purge: Purge, out: &mut Vec<PathBuf>) {
        let plugin = self.plugins.for_file(file);
        let Ok(destination) = plugin.resolve(file, &self.options) else {
            return;
        };
        let base = to_non_hashed(&destination, &file.checksum);
        let built = self.built_checksum(&file.path).unwrap_or_default();

        let hashes = match purge {
            Purge::All => vec![&file.checksum, &file.previous, &built],
            Purge::Previous => vec![&file.previous, &built],
        };
        let mut variants: Vec<PathBuf> = hashes
            .into_iter()
            .filter(|h| !h.is_empty())
            .filter(|h| purge == Purge::All || **h != file.checksum)
            .map(|h| to_hashed(&base, h))
            .collect();
        if purge == Purge::All {
            variants.push(base);
        }

        for variant in variants {
            let artifacts = plugin.artifacts(&variant);
            for path in std::iter::once(variant).chain(artifacts) {
                if !out.contains(&path) {
                    out.push(path);
                }
            }
        }
    }
}
