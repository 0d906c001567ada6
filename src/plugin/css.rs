//! Plain CSS: `@import` and `url()` references, lightningcss minification.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::minify::minify_css;
use super::scan::{Rule, scan, sibling};
use super::{Plugin, copy_sibling, copy_to, with_suffix};
use crate::config::Options;
use crate::engine::{File, Related, RelatedKind};
use crate::pattern;
use crate::utils::path::fs::write_atomic;

pub struct CssPlugin;

impl Plugin for CssPlugin {
    fn name(&self) -> &'static str {
        "css"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["css"]
    }

    fn related(&self, file: &File, _options: &Options) -> Result<Vec<Related>> {
        let import = pattern!(
            r#"@import\s+(?:url\(\s*)?["']?(?P<ref>[^"'()\s;]+)["']?\s*\)?"#
        );
        let url = pattern!(r#"url\(\s*["']?(?P<ref>[^"'()\s]+)["']?\s*\)"#);

        let mut related = scan(
            file,
            &[
                Rule {
                    pattern: import,
                    kind: RelatedKind::Import,
                    dependency: false,
                    extensions: &[".css"],
                },
                Rule {
                    pattern: url,
                    kind: RelatedKind::Other("url".into()),
                    dependency: false,
                    extensions: &[],
                },
            ],
        );
        related.push(sibling(file, ".map", RelatedKind::SourceMap));
        Ok(related)
    }

    fn transform(&self, file: &File, destination: &Path, options: &Options) -> Result<Vec<PathBuf>> {
        let mut written = copy_to(file, destination)?;
        if options.should_source_map(&file.location)
            && let Some(map) = copy_sibling(file, ".map", destination)?
        {
            written.push(map);
        }
        Ok(written)
    }

    fn optimize(&self, file: &File, destination: &Path, options: &Options) -> Result<Vec<PathBuf>> {
        if !options.should_compress(&file.location) {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(destination)
            .with_context(|| format!("Failed to read {}", destination.display()))?;
        let minified = minify_css(&content)?;
        write_atomic(destination, minified.as_bytes(), file.permission)?;
        Ok(vec![destination.to_path_buf()])
    }

    fn artifacts(&self, destination: &Path) -> Vec<PathBuf> {
        vec![with_suffix(destination, ".map")]
    }
}
