//! Per-format plugins.
//!
//! A plugin owns everything format specific: destination naming, reference
//! discovery, transformation and optimization. The engine only sees the
//! [`Plugin`] trait.
//!
//! | Plugin       | Extensions                      | Tooling                 |
//! |--------------|---------------------------------|-------------------------|
//! | `generic`    | everything else                 | copy                    |
//! | `css`        | css                             | lightningcss            |
//! | `sass`       | scss, sass                      | `sass` CLI              |
//! | `javascript` | js, mjs, cjs                    | oxc                     |
//! | `typescript` | ts, tsx, mts                    | `tsc` CLI + oxc         |
//! | `declaration`| d.ts, d.mts                     | none (no output)        |
//! | `html`       | html, htm                       | regex scan + minify     |
//! | `json`       | json, webmanifest               | serde_json              |
//! | `xml`        | xml, svg                        | quick-xml               |
//! | `image`      | png, jpg, jpeg, gif, webp       | image                   |

mod css;
mod generic;
mod html;
mod javascript;
mod json;
pub mod minify;
mod raster;
mod sass;
pub mod scan;
mod typescript;
mod xml;

pub use css::CssPlugin;
pub use generic::GenericPlugin;
pub use html::HtmlPlugin;
pub use javascript::JavascriptPlugin;
pub use json::JsonPlugin;
pub use raster::ImagePlugin;
pub use sass::SassPlugin;
pub use typescript::{DeclarationPlugin, TypescriptPlugin};
pub use xml::XmlPlugin;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;

use crate::config::Options;
use crate::engine::{File, Related};
use crate::utils::path::fs::write_atomic;
use crate::utils::path::name::to_extension;

/// Capability contract implemented once per file-type family.
///
/// `resolve` and `related` must be pure functions of the file and options.
/// `transform` and `optimize` write to `destination` and return every path
/// they wrote.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Handled extensions, lowercase, without the leading dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Verify the transformer is available. Must be idempotent.
    fn init(&self, _options: &Options) -> Result<()> {
        Ok(())
    }

    /// Destination path for `file`.
    fn resolve(&self, file: &File, options: &Options) -> Result<PathBuf> {
        Ok(destination_for(file, options, None))
    }

    /// Outgoing references of `file`.
    fn related(&self, _file: &File, _options: &Options) -> Result<Vec<Related>> {
        Ok(Vec::new())
    }

    /// Produce `destination` from `file`.
    fn transform(&self, file: &File, destination: &Path, options: &Options) -> Result<Vec<PathBuf>>;

    /// Whether `transform` works from `File::content` alone. Plugins that
    /// hand the source path to an external compiler cannot build bundles.
    fn accepts_content(&self) -> bool {
        true
    }

    /// Optional in-place pass over `destination`.
    fn optimize(&self, _file: &File, _destination: &Path, _options: &Options) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    /// Generated siblings that may exist next to `destination`.
    fn artifacts(&self, _destination: &Path) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Release long-lived resources.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Mirror `file` into the destination tree, optionally swapping the
/// extension, and insert the content hash when hashing is enabled.
pub fn destination_for(file: &File, options: &Options, extension: Option<&str>) -> PathBuf {
    let mut destination = options.destination.join(&file.location);
    if let Some(ext) = extension {
        destination = to_extension(&destination, ext);
    }
    options.to_hashed(&destination, &file.checksum)
}

/// Write the file's content unchanged to `destination`.
pub fn copy_to(file: &File, destination: &Path) -> Result<Vec<PathBuf>> {
    write_atomic(destination, &file.content, file.permission)
        .with_context(|| format!("Failed to write {}", destination.display()))?;
    Ok(vec![destination.to_path_buf()])
}

/// `path` with `suffix` appended to the file name (`app.js` -> `app.js.map`).
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// Copy an author-provided sibling (source map, declaration) next to the
/// destination when it exists in the source tree.
pub fn copy_sibling(file: &File, suffix: &str, destination: &Path) -> Result<Option<PathBuf>> {
    let source = with_suffix(&file.path, suffix);
    if !source.is_file() {
        return Ok(None);
    }
    let content =
        std::fs::read(&source).with_context(|| format!("Failed to read {}", source.display()))?;
    let target = with_suffix(destination, suffix);
    write_atomic(&target, &content, file.permission)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(Some(target))
}

// ============================================================================
// Registry
// ============================================================================

/// Plugin lookup: exact-extension map plus one explicit generic fallback.
pub struct PluginRegistry {
    by_extension: FxHashMap<String, Arc<dyn Plugin>>,
    generic: Arc<dyn Plugin>,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    /// Empty registry: everything falls back to `generic`.
    pub fn new(generic: Arc<dyn Plugin>) -> Self {
        Self {
            by_extension: FxHashMap::default(),
            plugins: vec![generic.clone()],
            generic,
        }
    }

    /// Registry with every built-in plugin, minus disabled extensions.
    pub fn with_defaults(options: &Options) -> Self {
        let mut registry = Self::new(Arc::new(GenericPlugin));
        registry.register(Arc::new(CssPlugin));
        registry.register(Arc::new(SassPlugin));
        registry.register(Arc::new(JavascriptPlugin));
        registry.register(Arc::new(TypescriptPlugin));
        registry.register(Arc::new(DeclarationPlugin));
        registry.register(Arc::new(HtmlPlugin));
        registry.register(Arc::new(JsonPlugin));
        registry.register(Arc::new(XmlPlugin));
        registry.register(Arc::new(ImagePlugin));
        registry.disable(&options.disable);
        registry
    }

    /// Register a plugin for all of its extensions. Later registrations
    /// replace earlier ones for the same extension.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        for ext in plugin.extensions() {
            self.by_extension.insert((*ext).to_owned(), plugin.clone());
        }
        self.plugins.push(plugin);
    }

    /// Route the given extensions (and compound ones ending in them) to the
    /// generic plugin.
    pub fn disable(&mut self, extensions: &[String]) {
        for ext in extensions {
            let ext = ext.trim_start_matches('.').to_ascii_lowercase();
            let compound = format!(".{ext}");
            self.by_extension
                .retain(|key, _| *key != ext && !key.ends_with(&compound));
        }
    }

    /// Plugin for an extension (with or without dot).
    pub fn for_extension(&self, extension: &str) -> &dyn Plugin {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        self.by_extension
            .get(&ext)
            .unwrap_or(&self.generic)
            .as_ref()
    }

    /// Plugin for a file. The longest registered extension wins, so
    /// `types.d.ts` finds `d.ts` before `ts`.
    pub fn for_file(&self, file: &File) -> &dyn Plugin {
        let name = file.file.to_ascii_lowercase();
        name.match_indices('.')
            .filter(|(i, _)| *i > 0)
            .find_map(|(i, _)| self.by_extension.get(&name[i + 1..]))
            .map_or_else(|| self.for_extension(file.ext()), |p| p.as_ref())
    }

    /// Every registered plugin, generic first.
    pub fn all(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.iter().map(|p| p.as_ref())
    }
}
