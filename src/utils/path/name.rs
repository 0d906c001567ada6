//! File name manipulation: extensions and content-hash segments.
//!
//! A hash segment sits immediately before the final extension:
//!
//! ```text
//! css/app.css   --to_hashed("1a2b")-->  css/app.1a2b.css
//! LICENSE       --to_hashed("1a2b")-->  LICENSE.1a2b
//! ```
//!
//! `to_non_hashed` is the exact inverse for any hash produced by `to_hashed`.

use std::path::{Path, PathBuf};

/// Extension of a path including the leading dot (`".css"`), or `""`.
pub fn extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// File name without its final extension.
pub fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Replace the final extension. `ext` may be given with or without the dot;
/// an empty `ext` strips the extension.
pub fn to_extension(path: &Path, ext: &str) -> PathBuf {
    path.with_extension(ext.trim_start_matches('.'))
}

/// Insert `.<hash>` before the final extension of the file name.
pub fn to_hashed(path: &Path, hash: &str) -> PathBuf {
    if hash.is_empty() {
        return path.to_path_buf();
    }
    let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return path.to_path_buf();
    };

    let hashed = match split_extension(&file_name) {
        (name, Some(ext)) => format!("{name}.{hash}.{ext}"),
        (name, None) => format!("{name}.{hash}"),
    };
    path.with_file_name(hashed)
}

/// Remove the `.<hash>` segment inserted by [`to_hashed`].
///
/// Paths that do not carry exactly this segment are returned unchanged.
pub fn to_non_hashed(path: &Path, hash: &str) -> PathBuf {
    if hash.is_empty() {
        return path.to_path_buf();
    }
    let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return path.to_path_buf();
    };

    let segment = format!(".{hash}");
    if let (name, Some(ext)) = split_extension(&file_name)
        && let Some(base) = name.strip_suffix(&segment)
        && !base.is_empty()
    {
        return path.with_file_name(format!("{base}.{ext}"));
    }

    // Extensionless name: the hash itself became the "extension".
    match file_name.strip_suffix(&segment) {
        Some(base) if !base.is_empty() => path.with_file_name(base),
        _ => path.to_path_buf(),
    }
}

/// Split `name.ext` at the last dot. Leading-dot names (`.env`) have no extension.
fn split_extension(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < file_name.len() => {
            (&file_name[..pos], Some(&file_name[pos + 1..]))
        }
        _ => (file_name, None),
    }
}

/// Convert a path to a forward-slash string for use inside file content.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
        .replace("//", "/")
}
