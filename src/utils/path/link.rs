//! Link classification for references found in file content.

/// Check if a link is external (has a URL scheme like `http:`, `data:`,
/// `mailto:`) or is protocol-relative (`//cdn.example.com/x.js`).
///
/// A valid scheme must:
/// - Have at least 1 character before the colon
/// - Only contain ASCII alphanumeric or `+`, `-`, `.`
#[inline]
pub fn is_external_link(link: &str) -> bool {
    if link.starts_with("//") {
        return true;
    }
    link.find(':').is_some_and(|pos| {
        pos > 0
            && link[..pos]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Strip a `?query` and/or `#fragment` suffix, returning the path part.
#[inline]
pub fn strip_query_fragment(link: &str) -> &str {
    let end = link.find(['?', '#']).unwrap_or(link.len());
    &link[..end]
}
