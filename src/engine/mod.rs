//! Build engine.
//!
//! The [`Engine`] owns every piece of mutable state: the options, the file
//! registry and the plugin lookup. There are no process-wide registries, so
//! several engines (for example one per test) can coexist.
//!
//! # Lifecycle
//!
//! ```text
//! index ──► resolve references ──► assemble bundles ──► resolve destinations
//!   │
//!   ▼
//! packages ──► build (init → transform → rewrite → optimize → stale purge)
//!   │                └── source gone ──► delete
//!   ▼
//! handle_event (watch) ──► reindex dir ──► affected packages ──► build
//! ```

mod build;
mod bundle;
mod delete;
mod file;
mod package;
mod registry;
mod rewrite;
mod watch;

pub use build::{BuildError, BuildReport};
#[cfg(test)]
pub use build::Stage;
pub use file::{File, Related, RelatedKind};
pub use registry::{Registry, ScanStats};
pub use watch::{ChangeKind, WatchEvent};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::Options;
use crate::debug;
use crate::plugin::PluginRegistry;

pub struct Engine {
    options: Options,
    registry: Registry,
    /// Assembled bundle files, keyed by their path under the source root.
    bundles: BTreeMap<PathBuf, File>,
    plugins: PluginRegistry,
    /// Checksum each package's artifacts on disk were last built from.
    built: Mutex<FxHashMap<PathBuf, String>>,
}

impl Engine {
    pub fn new(options: Options, plugins: PluginRegistry) -> Self {
        Self {
            options,
            registry: Registry::new(),
            bundles: BTreeMap::new(),
            plugins,
            built: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// A registry file or an assembled bundle.
    pub fn lookup(&self, path: &Path) -> Option<&File> {
        self.registry.get(path).or_else(|| self.bundles.get(path))
    }

    /// Scan the whole source tree, then rebuild the reference graph and
    /// every destination path.
    pub fn index(&mut self) -> Result<ScanStats> {
        let source = self.options.source.clone();
        if !source.is_dir() {
            bail!("source directory `{}` not found", source.display());
        }

        let stats = self.registry.index_tree(&source, &source, &self.options);
        debug!(
            "index";
            "{} appended, {} updated, {} removed",
            stats.appended,
            stats.updated,
            stats.removed
        );

        self.resolve_references();
        self.resolve_bundles();
        self.resolve_destinations();
        Ok(stats)
    }

    /// Re-run every plugin's `related` over the registry.
    ///
    /// Files that are gone keep their last edges so deletion and propagation
    /// can still follow them. A failing scan leaves the file without edges.
    pub fn resolve_references(&mut self) {
        let plugins = &self.plugins;
        let options = &self.options;

        let resolved: Vec<(PathBuf, Vec<Related>)> = self
            .registry
            .map()
            .par_iter()
            .filter(|(_, file)| file.exists)
            .map(|(path, file)| {
                let related = plugins.for_file(file).related(file, options).unwrap_or_else(|e| {
                    debug!("related"; "{}: {:#}", path.display(), e);
                    Vec::new()
                });
                (path.clone(), related)
            })
            .collect();

        for (path, related) in resolved {
            if let Some(file) = self.registry.get_mut(&path) {
                file.related = related;
            }
        }
    }

    /// Store each file's destination as its plugin resolves it.
    pub fn resolve_destinations(&mut self) {
        let plugins = &self.plugins;
        let options = &self.options;

        for file in self.registry.iter_mut() {
            match plugins.for_file(file).resolve(file, options) {
                Ok(destination) => file.destination = destination,
                Err(e) => {
                    debug!("resolve"; "{}: {:#}", file.path.display(), e);
                    file.destination = PathBuf::new();
                }
            }
        }
    }

    /// Release plugin resources. Errors are logged, never fatal.
    pub fn shutdown(&self) {
        for plugin in self.plugins.all() {
            if let Err(e) = plugin.shutdown() {
                debug!("shutdown"; "{}: {:#}", plugin.name(), e);
            }
        }
    }
}
