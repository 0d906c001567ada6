//! Indexed source files and their outgoing references.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::hash::checksum;
use crate::utils::path::fs::{DEFAULT_PERMISSION, read_permission};
use crate::utils::path::name::{extension, stem};

/// How a referencing file relates to its target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelatedKind {
    Import,
    Partial,
    SourceMap,
    Declaration,
    Alternative,
    /// Bundle member, concatenated into the referencing file.
    Member,
    Other(String),
}

impl fmt::Display for RelatedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Import => f.write_str("import"),
            Self::Partial => f.write_str("partial"),
            Self::SourceMap => f.write_str("source-map"),
            Self::Declaration => f.write_str("declaration"),
            Self::Alternative => f.write_str("alternative"),
            Self::Member => f.write_str("member"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// A directed edge from one file to another.
///
/// `dependency = true`: the target is built and deleted together with the
/// referencing file and never becomes a package of its own.
///
/// `dependency = false`: the target is an independent package whose
/// destination path replaces `reference` inside `source` in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Related {
    pub kind: RelatedKind,
    pub dependency: bool,
    /// Literal snippet as it appeared in the referencing content.
    pub source: String,
    /// Reference as written by the author.
    pub reference: String,
    pub target: PathBuf,
}

impl Related {
    /// A dependency edge to a conventionally named sibling (no snippet).
    pub fn sibling(kind: RelatedKind, target: PathBuf) -> Self {
        Self {
            kind,
            dependency: true,
            source: String::new(),
            reference: String::new(),
            target,
        }
    }

    /// An edge discovered in file content.
    pub fn found(
        kind: RelatedKind,
        dependency: bool,
        source: impl Into<String>,
        reference: impl Into<String>,
        target: PathBuf,
    ) -> Self {
        Self {
            kind,
            dependency,
            source: source.into(),
            reference: reference.into(),
            target,
        }
    }
}

/// One indexed filesystem entry.
#[derive(Debug, Clone, Default)]
pub struct File {
    /// Absolute path, the registry key.
    pub path: PathBuf,
    /// Root the file was indexed under.
    pub root: PathBuf,
    /// Path relative to `root`.
    pub location: PathBuf,
    /// Containing directory.
    pub folder: PathBuf,
    /// File name with extension.
    pub file: String,
    /// File name without extension.
    pub name: String,
    /// Extension with leading dot, or empty.
    pub extension: String,
    /// Content snapshot, empty when the file is not on disk.
    pub content: Vec<u8>,
    pub permission: u32,
    pub exists: bool,
    /// Checksum of `content`, empty when unreadable.
    pub checksum: String,
    /// Checksum before the last content change.
    pub previous: String,
    /// Resolved destination path, empty until resolved.
    pub destination: PathBuf,
    pub related: Vec<Related>,
}

impl File {
    /// Read a file from disk.
    ///
    /// Unreadable content is recorded as empty with an empty checksum; an
    /// unreadable permission falls back to `0o644`.
    pub fn read(path: &Path, root: &Path) -> Self {
        let mut entry = Self::identity(path, root);
        entry.load();
        entry
    }

    /// An in-memory file that exists only as `content`, never on disk.
    pub fn assembled(path: &Path, root: &Path, content: Vec<u8>) -> Self {
        Self {
            exists: true,
            checksum: checksum(&content),
            content,
            ..Self::identity(path, root)
        }
    }

    fn identity(path: &Path, root: &Path) -> Self {
        let location = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        let folder = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
            location,
            folder,
            file,
            name: stem(path),
            extension: extension(path).to_ascii_lowercase(),
            permission: DEFAULT_PERMISSION,
            ..Self::default()
        }
    }

    /// Re-read disk state. `previous` only advances when the checksum changed.
    ///
    /// Returns whether the checksum changed.
    pub fn refresh(&mut self) -> bool {
        let before = std::mem::take(&mut self.checksum);
        self.load();
        if !self.exists {
            // Vanished between the scan and this read
            self.checksum = before;
            return false;
        }
        if self.checksum != before {
            self.previous = before;
            true
        } else {
            false
        }
    }

    /// Soft delete: clear content, keep checksums and edges for deletion.
    pub fn mark_removed(&mut self) {
        self.content = Vec::new();
        self.exists = false;
    }

    fn load(&mut self) {
        self.exists = self.path.is_file();
        if !self.exists {
            self.content = Vec::new();
            return;
        }

        match fs::read(&self.path) {
            Ok(content) => {
                self.checksum = checksum(&content);
                self.content = content;
            }
            Err(e) => {
                crate::debug!("index"; "unreadable {}: {}", self.path.display(), e);
                self.content = Vec::new();
                self.checksum = String::new();
            }
        }
        self.permission = read_permission(&self.path).unwrap_or(DEFAULT_PERMISSION);
    }

    /// Content as text (lossy UTF-8).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Extension without the leading dot.
    pub fn ext(&self) -> &str {
        self.extension.trim_start_matches('.')
    }
}
