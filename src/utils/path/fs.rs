//! Filesystem path helpers.
//!
//! - `normalize_path` - absolute form (canonicalize + fallback)
//! - `clean_path` - lexical `.`/`..` removal for paths that may not exist
//! - `write_atomic` - temp file in the target folder, then rename
//! - `remove_file` - idempotent removal

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;

/// Permission bits used when the real ones cannot be read.
pub const DEFAULT_PERMISSION: u32 = 0o644;

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return the cleaned path if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            clean_path(path)
        } else {
            std::env::current_dir()
                .map_or_else(|_| path.to_path_buf(), |cwd| clean_path(&cwd.join(path)))
        }
    })
}

/// Resolve a path that may be relative to cwd or a fallback directory.
///
/// Always returns an absolute path.
#[inline]
pub fn resolve_path(path: &Path, fallback_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        return clean_path(path);
    }

    if path.exists() {
        return normalize_path(path);
    }

    normalize_path(&fallback_dir.join(path))
}

/// Remove `.` and `..` components without touching the filesystem.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Create the parent directory of `file` if it is missing.
pub fn ensure_parent(file: &Path) -> io::Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            fs::create_dir_all(parent)
        }
        _ => Ok(()),
    }
}

/// Write `content` to `path` through a sibling temp file and an atomic rename.
///
/// A previous file at `path` stays intact until the new content is complete.
pub fn write_atomic(path: &Path, content: &[u8], permission: u32) -> io::Result<()> {
    ensure_parent(path)?;
    let folder = path.parent().unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(folder)?;
    temp.write_all(content)?;
    temp.as_file().sync_data()?;
    set_permission(temp.path(), permission)?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read the permission bits of a file.
pub fn read_permission(path: &Path) -> io::Result<u32> {
    let meta = fs::metadata(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Ok(meta.permissions().mode() & 0o777)
    }
    #[cfg(not(unix))]
    {
        Ok(if meta.permissions().readonly() {
            0o444
        } else {
            DEFAULT_PERMISSION
        })
    }
}

/// Apply permission bits to a file.
pub fn set_permission(path: &Path, permission: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(permission))
    }
    #[cfg(not(unix))]
    {
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_readonly(permission & 0o200 == 0);
        fs::set_permissions(path, perms)
    }
}

/// Remove a file if present. Returns whether something was removed.
pub fn remove_file(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
