//! TypeScript through the external `tsc` compiler, minified with oxc.
//!
//! Each package is transpiled on its own into a scratch directory rooted at
//! the source root; the emitted `.js` (and `.js.map`) are then moved to the
//! destination. Standalone declaration files go to [`DeclarationPlugin`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tempfile::TempDir;

use super::javascript::{minify_destination, module_references};
use super::{Plugin, destination_for, with_suffix};
use crate::config::Options;
use crate::engine::{File, Related};
use crate::utils::exec::{Cmd, require};
use crate::utils::path::fs::write_atomic;
use crate::utils::path::name::to_extension;

pub struct TypescriptPlugin;

/// `.d.ts` files carry types only: they need no compiler and produce nothing.
pub struct DeclarationPlugin;

impl Plugin for TypescriptPlugin {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "mts"]
    }

    fn init(&self, _options: &Options) -> Result<()> {
        require("tsc").map(|_| ())
    }

    fn resolve(&self, file: &File, options: &Options) -> Result<PathBuf> {
        Ok(destination_for(file, options, Some("js")))
    }

    fn accepts_content(&self) -> bool {
        false
    }

    fn related(&self, file: &File, _options: &Options) -> Result<Vec<Related>> {
        Ok(module_references(file, &[".ts", ".tsx", ".mts", ".js"]))
    }

    fn transform(&self, file: &File, destination: &Path, options: &Options) -> Result<Vec<PathBuf>> {
        let source_map = options.should_source_map(&file.location);
        let scratch = TempDir::new().context("Failed to create scratch directory")?;

        Cmd::new("tsc")
            .arg(&file.path)
            .args(["--outDir"])
            .arg(scratch.path())
            .arg("--rootDir")
            .arg(&file.root)
            .args(["--target", "es2020", "--module", "esnext"])
            .args(["--moduleResolution", "bundler", "--skipLibCheck"])
            .args(["--noEmitOnError", "false"])
            .arg(if file.ext() == "tsx" { "--jsx=react-jsx" } else { "" })
            .arg(if source_map { "--sourceMap" } else { "" })
            .cwd(&file.root)
            .timeout(options.timeout())
            .run()?;

        let emitted_ext = if file.ext() == "mts" { "mjs" } else { "js" };
        let emitted = to_extension(&scratch.path().join(&file.location), emitted_ext);
        if !emitted.is_file() {
            bail!("tsc produced no output for {}", file.path.display());
        }

        let mut code = fs::read_to_string(&emitted)
            .with_context(|| format!("Failed to read {}", emitted.display()))?;

        let mut written = Vec::new();
        let map = with_suffix(&emitted, ".map");
        if source_map && map.is_file() {
            let target = with_suffix(destination, ".map");
            let map_name = format!("{}.{emitted_ext}.map", file.name);
            let target_name = target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            code = code.replace(
                &format!("sourceMappingURL={map_name}"),
                &format!("sourceMappingURL={target_name}"),
            );

            let content = fs::read(&map).with_context(|| format!("Failed to read {}", map.display()))?;
            write_atomic(&target, &content, file.permission)?;
            written.push(target);
        }

        write_atomic(destination, code.as_bytes(), file.permission)?;
        written.insert(0, destination.to_path_buf());
        Ok(written)
    }

    fn optimize(&self, file: &File, destination: &Path, options: &Options) -> Result<Vec<PathBuf>> {
        minify_destination(file, destination, options)
    }

    fn artifacts(&self, destination: &Path) -> Vec<PathBuf> {
        vec![with_suffix(destination, ".map")]
    }
}

impl Plugin for DeclarationPlugin {
    fn name(&self) -> &'static str {
        "declaration"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["d.ts", "d.mts"]
    }

    fn transform(&self, _file: &File, _destination: &Path, _options: &Options) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}
