//! Cross-package reference rewriting.
//!
//! Substitution is textual: every non-dependency edge carries the literal
//! snippet it was found in, and the first unclaimed occurrence of that
//! snippet in the built output is replaced. Edges are processed in discovery
//! order, so repeated identical snippets map one-to-one onto occurrences.

use std::fs;
use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};

use super::{Engine, File, Related};
use crate::debug;
use crate::plugin::minify::splice;
use crate::utils::path::fs::write_atomic;
use crate::utils::path::link::strip_query_fragment;
use crate::utils::path::name::to_slash;
use crate::utils::path::relative_to;

impl Engine {
    /// Point every resolvable non-dependency reference in `destination` at
    /// its target's current destination. Returns whether anything changed.
    pub(super) fn rewrite(&self, file: &File, destination: &Path) -> Result<bool> {
        let edges: Vec<(&Related, String)> = file
            .related
            .iter()
            .filter(|edge| !edge.dependency && !edge.source.is_empty())
            .filter_map(|edge| {
                let reference = self.rewritten_reference(edge, destination)?;
                (reference != edge.reference).then_some((edge, reference))
            })
            .collect();
        if edges.is_empty() {
            return Ok(false);
        }

        let content = fs::read_to_string(destination)
            .with_context(|| format!("Failed to read {}", destination.display()))?;

        let mut claimed: Vec<Range<usize>> = Vec::new();
        let mut edits = Vec::new();
        for (edge, reference) in edges {
            let occurrence = content
                .match_indices(edge.source.as_str())
                .map(|(start, s)| start..start + s.len())
                .find(|r| !claimed.iter().any(|c| c.start < r.end && r.start < c.end));

            let Some(range) = occurrence else {
                debug!("rewrite"; "snippet not found in {}: {}", destination.display(), edge.source);
                continue;
            };
            claimed.push(range.clone());
            edits.push((range, edge.source.replacen(&edge.reference, &reference, 1)));
        }
        if edits.is_empty() {
            return Ok(false);
        }

        write_atomic(destination, splice(&content, edits).as_bytes(), file.permission)
            .with_context(|| format!("Failed to write {}", destination.display()))?;
        Ok(true)
    }

    /// The reference text pointing from `destination` to the edge target's
    /// package output, or `None` when the target is missing or unbuilt.
    fn rewritten_reference(&self, edge: &Related, destination: &Path) -> Option<String> {
        let target = self.lookup(&edge.target).filter(|t| t.exists)?;
        let package = self.locate_package(&target.path)?;
        let target_destination = self
            .lookup(&package)
            .map(|p| p.destination.as_path())
            .filter(|d| !d.as_os_str().is_empty())?;

        let path_part = strip_query_fragment(&edge.reference);
        let suffix = &edge.reference[path_part.len()..];

        let path = if edge.reference.starts_with('/') {
            let location = target_destination.strip_prefix(&self.options.destination).ok()?;
            format!("/{}", to_slash(location))
        } else {
            let relative = to_slash(&relative_to(target_destination, destination.parent()?));
            if edge.reference.starts_with("./") && !relative.starts_with("../") {
                format!("./{relative}")
            } else {
                relative
            }
        };

        Some(format!("{path}{suffix}"))
    }
}
