//! JSON and web manifests: copied, then re-serialized compactly.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::minify::minify_json;
use super::{Plugin, copy_to};
use crate::config::Options;
use crate::engine::File;
use crate::utils::path::fs::write_atomic;

pub struct JsonPlugin;

impl Plugin for JsonPlugin {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json", "webmanifest"]
    }

    fn transform(&self, file: &File, destination: &Path, _options: &Options) -> Result<Vec<PathBuf>> {
        copy_to(file, destination)
    }

    fn optimize(&self, file: &File, destination: &Path, options: &Options) -> Result<Vec<PathBuf>> {
        if !options.should_compress(&file.location) {
            return Ok(Vec::new());
        }
        let content =
            fs::read(destination).with_context(|| format!("Failed to read {}", destination.display()))?;
        let minified = minify_json(&content)
            .with_context(|| format!("Invalid JSON in {}", file.path.display()))?;
        write_atomic(destination, &minified, file.permission)?;
        Ok(vec![destination.to_path_buf()])
    }
}
