//! Per-package build.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use rayon::prelude::*;
use thiserror::Error;

use super::delete::Purge;
use super::{Engine, File};
use crate::debug;
use crate::logger::ProgressLine;
use crate::plugin::Plugin;
use crate::utils::path::fs::{ensure_parent, remove_file};

/// Pipeline step a build failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Resolve,
    Transform,
    Rewrite,
    Optimize,
    Delete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Resolve => "resolve",
            Self::Transform => "transform",
            Self::Rewrite => "rewrite",
            Self::Optimize => "optimize",
            Self::Delete => "delete",
        })
    }
}

/// A failed package build.
#[derive(Debug, Error)]
#[error("{stage} failed for {}", .path.display())]
pub struct BuildError {
    pub path: PathBuf,
    pub stage: Stage,
    pub source: anyhow::Error,
}

impl BuildError {
    fn at(path: &Path, stage: Stage) -> impl FnOnce(anyhow::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self {
            path,
            stage,
            source,
        }
    }
}

/// What a build (or deletion) touched on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub package: PathBuf,
    pub written: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

impl BuildReport {
    pub fn new(package: &Path) -> Self {
        Self {
            package: package.to_path_buf(),
            ..Self::default()
        }
    }

    fn record_written(&mut self, paths: Vec<PathBuf>) {
        for path in paths {
            if !self.written.contains(&path) {
                self.written.push(path);
            }
        }
    }
}

impl Engine {
    /// Build one package.
    ///
    /// A package whose source is gone takes the deletion branch instead.
    /// After a content change, artifacts of the previous checksum and of the
    /// last successful build are purged. A build that fails after `transform`
    /// removes what it wrote, so the last good output stays the only one.
    pub fn build(&self, package: &Path) -> Result<BuildReport, BuildError> {
        let file = self
            .lookup(package)
            .ok_or_else(|| anyhow!("not indexed"))
            .map_err(BuildError::at(package, Stage::Resolve))?;
        let plugin = self.plugins.for_file(file);
        let options = &self.options;

        let destination = plugin
            .resolve(file, options)
            .map_err(BuildError::at(package, Stage::Resolve))?;

        if self.bundles.contains_key(package) && !plugin.accepts_content() {
            return Err(BuildError::at(package, Stage::Resolve)(anyhow!(
                "{} output cannot be bundled",
                plugin.name()
            )));
        }

        plugin
            .init(options)
            .map_err(BuildError::at(package, Stage::Init))?;

        if !file.exists {
            return self
                .delete(package)
                .map_err(BuildError::at(package, Stage::Delete));
        }

        ensure_parent(&destination)
            .map_err(|e| BuildError::at(package, Stage::Resolve)(e.into()))?;

        let mut report = BuildReport::new(package);
        let written = plugin
            .transform(file, &destination, options)
            .map_err(BuildError::at(package, Stage::Transform))?;
        report.record_written(written);

        if destination.is_file()
            && let Err(err) = self.finish(file, plugin, &destination, &mut report)
        {
            discard(&report.written);
            return Err(err);
        }

        let built = self.built_checksum(package);
        let stale = [Some(&file.previous), built.as_ref()]
            .into_iter()
            .flatten()
            .any(|hash| !hash.is_empty() && *hash != file.checksum);
        if stale {
            for stale in self.artifact_candidates(file, Purge::Previous) {
                if report.written.contains(&stale) {
                    continue;
                }
                let removed = remove_file(&stale)
                    .map_err(|e| BuildError::at(package, Stage::Delete)(e.into()))?;
                if removed {
                    report.deleted.push(stale);
                }
            }
        }

        self.built
            .lock()
            .insert(package.to_path_buf(), file.checksum.clone());
        Ok(report)
    }

    /// Rewrite references, then optimize in place.
    fn finish(
        &self,
        file: &File,
        plugin: &dyn Plugin,
        destination: &Path,
        report: &mut BuildReport,
    ) -> Result<(), BuildError> {
        let package = file.path.as_path();
        let rewritten = self
            .rewrite(file, destination)
            .map_err(BuildError::at(package, Stage::Rewrite))?;
        if rewritten {
            report.record_written(vec![destination.to_path_buf()]);
        }

        let optimized = plugin
            .optimize(file, destination, &self.options)
            .map_err(BuildError::at(package, Stage::Optimize))?;
        report.record_written(optimized);
        Ok(())
    }

    /// Checksum the artifacts of `package` on disk were last built from.
    pub(super) fn built_checksum(&self, package: &Path) -> Option<String> {
        self.built.lock().get(package).cloned()
    }

    /// Build every package in parallel.
    pub fn build_all(&self) -> Vec<Result<BuildReport, BuildError>> {
        let packages = self.packages();
        let progress = ProgressLine::new("packages", packages.len());

        let results = packages
            .par_iter()
            .map(|package| {
                let result = self.build(package);
                progress.inc();
                result
            })
            .collect();

        progress.finish();
        results
    }
}

/// Drop the output of a build that failed halfway.
fn discard(written: &[PathBuf]) {
    for path in written {
        if let Err(e) = remove_file(path) {
            debug!("build"; "failed to discard {}: {}", path.display(), e);
        }
    }
}
