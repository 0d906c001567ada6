//! Lightweight reference scanning.
//!
//! References are found by pattern matching, not parsing. Every pattern must
//! expose the referenced path as a capture group named `ref`; the whole match
//! becomes the edge's literal snippet.

use std::ops::Range;
use std::path::PathBuf;

use regex::Regex;

use crate::engine::{File, Related, RelatedKind};
use crate::utils::path::link::{is_external_link, strip_query_fragment};
use crate::utils::path::resolve_reference;

/// One scan rule.
pub struct Rule<'a> {
    pub pattern: &'a Regex,
    pub kind: RelatedKind,
    pub dependency: bool,
    /// Candidate extensions tried for extensionless references.
    pub extensions: &'a [&'a str],
}

/// Scan `file` with every rule in order.
///
/// A match overlapping an earlier match (from any rule) is skipped, so
/// `@import url(a.css)` is not reported again by a `url()` rule. External
/// links and empty references are skipped.
pub fn scan(file: &File, rules: &[Rule<'_>]) -> Vec<Related> {
    let text = file.text();
    let mut claimed: Vec<Range<usize>> = Vec::new();
    let mut related = Vec::new();

    for rule in rules {
        for caps in rule.pattern.captures_iter(&text) {
            let (Some(whole), Some(reference)) = (caps.get(0), caps.name("ref")) else {
                continue;
            };
            let range = whole.range();
            if claimed.iter().any(|c| c.start < range.end && range.start < c.end) {
                continue;
            }

            let raw = reference.as_str().trim();
            let path = strip_query_fragment(raw);
            if path.is_empty() || is_external_link(raw) || raw.starts_with('#') {
                continue;
            }

            claimed.push(range);
            related.push(Related::found(
                rule.kind.clone(),
                rule.dependency,
                whole.as_str(),
                raw,
                resolve_reference(path, rule.extensions, &file.folder, &file.root),
            ));
        }
    }

    related
}

/// Dependency edge to `<file><suffix>` next to the source file.
pub fn sibling(file: &File, suffix: &str, kind: RelatedKind) -> Related {
    let mut target = file.path.clone().into_os_string();
    target.push(suffix);
    Related::sibling(kind, PathBuf::from(target))
}

/// Lazily compiled static regex.
#[macro_export]
macro_rules! pattern {
    ($re:expr) => {{
        static RE: std::sync::LazyLock<regex::Regex> =
            std::sync::LazyLock::new(|| regex::Regex::new($re).unwrap());
        &*RE
    }};
}
