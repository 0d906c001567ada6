//! Pluralized counts for log lines.

/// `"s"` unless `n` is exactly one.
#[inline]
pub fn plural_s(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// `plural_count(1, "file")` → `"1 file"`, `plural_count(0, "file")` → `"0 files"`
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, plural_s(count))
}

/// Join `(count, noun, verb)` triples as `"2 files written, 1 file deleted"`,
/// skipping zero counts.
pub fn join_counts(entries: &[(usize, &str, &str)]) -> String {
    entries
        .iter()
        .filter(|(count, _, _)| *count > 0)
        .map(|(count, noun, verb)| format!("{} {}", plural_count(*count, noun), verb))
        .collect::<Vec<_>>()
        .join(", ")
}
