//! Fallback plugin: copy the file unchanged.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{Plugin, copy_to};
use crate::config::Options;
use crate::engine::File;

pub struct GenericPlugin;

impl Plugin for GenericPlugin {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[]
    }

    fn transform(&self, file: &File, destination: &Path, _options: &Options) -> Result<Vec<PathBuf>> {
        copy_to(file, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_copy_preserves_bytes() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("src/font.woff2");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, [0u8, 159, 146, 150]).unwrap();

        let file = File::read(&source, &dir.path().join("src"));
        let options = Options {
            destination: dir.path().join("dist"),
            ..Default::default()
        };
        let destination = GenericPlugin.resolve(&file, &options).unwrap();
        let written = GenericPlugin.transform(&file, &destination, &options).unwrap();

        assert_eq!(written, vec![destination.clone()]);
        assert_eq!(fs::read(&destination).unwrap(), vec![0u8, 159, 146, 150]);
        assert!(destination.to_string_lossy().ends_with(&format!("font.{}.woff2", file.checksum)));
    }
}
