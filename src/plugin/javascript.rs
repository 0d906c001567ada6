//! JavaScript: relative `import`/`export … from` references, oxc minification.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::minify::minify_js;
use super::scan::{Rule, scan, sibling};
use super::{Plugin, copy_sibling, copy_to, with_suffix};
use crate::config::Options;
use crate::engine::{File, Related, RelatedKind};
use crate::pattern;
use crate::utils::path::fs::write_atomic;

pub struct JavascriptPlugin;

/// Static and dynamic module references with candidate extensions.
///
/// Bare specifiers (`react`, `lodash/fp`) belong to a package manager and
/// are not tracked.
pub(super) fn module_references(file: &File, extensions: &[&str]) -> Vec<Related> {
    let from = pattern!(
        r#"(?m)\b(?:import|export)\s*(?:[\w$*{}\s,]+?\s*from\s*)?["'](?P<ref>[^"'\n]+)["']"#
    );
    let dynamic = pattern!(r#"\bimport\(\s*["'](?P<ref>[^"'\n]+)["']\s*\)"#);

    let rules = [from, dynamic].map(|pattern| Rule {
        pattern,
        kind: RelatedKind::Import,
        dependency: false,
        extensions,
    });

    scan(file, &rules)
        .into_iter()
        .filter(|r| r.reference.starts_with('.') || r.reference.starts_with('/'))
        .collect()
}

/// Minify `destination` in place when compression applies.
pub(super) fn minify_destination(
    file: &File,
    destination: &Path,
    options: &Options,
) -> Result<Vec<PathBuf>> {
    if !options.should_compress(&file.location) {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(destination)
        .with_context(|| format!("Failed to read {}", destination.display()))?;
    let minified = minify_js(&content, file.ext() != "cjs")?;
    write_atomic(destination, minified.as_bytes(), file.permission)?;
    Ok(vec![destination.to_path_buf()])
}

impl Plugin for JavascriptPlugin {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["js", "mjs", "cjs"]
    }

    fn related(&self, file: &File, _options: &Options) -> Result<Vec<Related>> {
        let mut related = module_references(file, &[".js", ".mjs", ".cjs"]);
        related.push(sibling(file, ".map", RelatedKind::SourceMap));
        related.push(Related::sibling(
            RelatedKind::Declaration,
            file.folder.join(format!("{}.d.ts", file.name)),
        ));
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
        minify_destination(file, destination, options)
    }

    fn artifacts(&self, destination: &Path) -> Vec<PathBuf> {
        vec![with_suffix(destination, ".map")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_related_module_references() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "js/lib/util.js", "");
        write(root, "js/config.mjs", "");
        let app = write(
            root,
            "js/app.js",
            r#"import { a, b } from "./lib/util";
import React from 'react';
export * from './config.mjs';
const lazy = () => import("./lib/util.js");
"#,
        );

        let file = File::read(&app, root);
        let related = JavascriptPlugin.related(&file, &Options::default()).unwrap();

        let imports: Vec<_> = related.iter().filter(|r| !r.dependency).collect();
        assert_eq!(imports.len(), 3);
        assert_eq!(imports[0].reference, "./lib/util");
        assert_eq!(imports[0].source, r#"import { a, b } from "./lib/util""#);
        assert_eq!(imports[0].target, root.join("js/lib/util.js"));
        assert_eq!(imports[1].target, root.join("js/config.mjs"));
        assert_eq!(imports[2].target, root.join("js/lib/util.js"));

        let siblings: Vec<_> = related.iter().filter(|r| r.dependency).collect();
        assert_eq!(siblings[0].target, root.join("js/app.js.map"));
        assert_eq!(siblings[1].target, root.join("js/app.d.ts"));
    }

    #[test]
    fn test_side_effect_import() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "polyfill.js", "");
        let app = write(root, "app.js", "import './polyfill.js';\n");

        let file = File::read(&app, root);
        let related = module_references(&file, &[".js"]);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].source, "import './polyfill.js'");
    }

    #[test]
    fn test_optimize_minifies() {
        let dir = TempDir::new().unwrap();
        let app = write(dir.path(), "src/app.js", "const message = 'hi';\nconsole.log(message);\n");
        let file = File::read(&app, &dir.path().join("src"));
        let options = Options {
            destination: dir.path().join("dist"),
            ..Default::default()
        };
        let destination = JavascriptPlugin.resolve(&file, &options).unwrap();

        JavascriptPlugin.transform(&file, &destination, &options).unwrap();
        JavascriptPlugin.optimize(&file, &destination, &options).unwrap();

        let out = fs::read_to_string(&destination).unwrap();
        assert!(out.len() < file.content.len());
        assert!(out.contains("console.log"));
    }
}
