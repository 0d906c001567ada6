//! Sass/SCSS through the external `sass` CLI.
//!
//! `@import`, `@use` and `@forward` targets are partials compiled into the
//! referencing stylesheet, so they are dependency edges. Partials
//! (`_name.scss`) never produce output on their own.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{Plugin, destination_for, with_suffix};
use crate::config::Options;
use crate::engine::{File, Related, RelatedKind};
use crate::pattern;
use crate::utils::exec::{Cmd, FilterRule, require};
use crate::utils::path::link::is_external_link;
use crate::utils::path::resolve_reference;

const EXTENSIONS: &[&str] = &[".scss", ".sass", ".css"];

/// Deprecation chatter from dart-sass.
static SASS_FILTER: FilterRule = FilterRule::new(&["Deprecation", "More info", "DEPRECATION"]);

pub struct SassPlugin;

impl SassPlugin {
    /// Resolve a Sass load reference, trying the `_partial` and `_index`
    /// conventions before plain names.
    fn resolve_partial(file: &File, reference: &str) -> PathBuf {
        let reference = reference.trim_end_matches('/');
        let (dir, name) = match reference.rsplit_once('/') {
            Some((dir, name)) => (format!("{dir}/"), name),
            None => (String::new(), reference),
        };

        let candidates = [
            format!("{dir}_{name}"),
            reference.to_owned(),
            format!("{reference}/_index"),
            format!("{reference}/index"),
        ];
        for candidate in &candidates {
            let found = resolve_reference(candidate, EXTENSIONS, &file.folder, &file.root);
            if found.is_file() {
                return found;
            }
        }
        resolve_reference(reference, EXTENSIONS, &file.folder, &file.root)
    }
}

impl Plugin for SassPlugin {
    fn name(&self) -> &'static str {
        "sass"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["scss", "sass"]
    }

    fn init(&self, _options: &Options) -> Result<()> {
        require("sass").map(|_| ())
    }

    fn accepts_content(&self) -> bool {
        false
    }

    fn resolve(&self, file: &File, options: &Options) -> Result<PathBuf> {
        Ok(destination_for(file, options, Some("css")))
    }

    fn related(&self, file: &File, _options: &Options) -> Result<Vec<Related>> {
        let statement = pattern!(r#"@(?P<rule>import|use|forward)\s+(?P<list>["'][^;\n]*)"#);
        let item = pattern!(r#"["'](?P<ref>[^"']+)["']"#);

        let text = file.text();
        let mut related = Vec::new();
        for caps in statement.captures_iter(&text) {
            let (Some(rule), Some(list)) = (caps.name("rule"), caps.name("list")) else {
                continue;
            };
            // `@use` and `@forward` load one module, `@import` takes a list
            let take = if rule.as_str() == "import" { usize::MAX } else { 1 };
            for found in item.captures_iter(list.as_str()).take(take) {
                let (Some(whole), Some(reference)) = (found.get(0), found.name("ref")) else {
                    continue;
                };
                let reference = reference.as_str().trim();
                if reference.is_empty() || is_external_link(reference) {
                    continue;
                }
                related.push(Related::found(
                    RelatedKind::Partial,
                    true,
                    whole.as_str(),
                    reference,
                    Self::resolve_partial(file, reference),
                ));
            }
        }

        related.push(Related::sibling(
            RelatedKind::SourceMap,
            file.folder.join(format!("{}.css.map", file.name)),
        ));
        Ok(related)
    }

    fn transform(&self, file: &File, destination: &Path, options: &Options) -> Result<Vec<PathBuf>> {
        if file.name.starts_with('_') {
            return Ok(Vec::new());
        }

        let compress = options.should_compress(&file.location);
        let source_map = options.should_source_map(&file.location);

        Cmd::new("sass")
            .arg(&file.path)
            .arg(destination)
            .arg(if compress { "--style=compressed" } else { "--style=expanded" })
            .args(if source_map {
                ["--source-map", "--embed-sources"]
            } else {
                ["--no-source-map", ""]
            })
            .cwd(&file.root)
            .timeout(options.timeout())
            .filter(&SASS_FILTER)
            .run()?;

        let mut written = vec![destination.to_path_buf()];
        if source_map {
            written.push(with_suffix(destination, ".map"));
        }
        Ok(written)
    }

    fn artifacts(&self, destination: &Path) -> Vec<PathBuf> {
        vec![with_suffix(destination, ".map")]
    }
}
