//! Build options.
//!
//! Loaded from an optional `compactor.toml`, then overridden by CLI flags.
//!
//! ```toml
//! source = "src"
//! destination = "dist"
//! hashed = true
//! ignore = ["*.md"]
//!
//! [compress]
//! enabled = true
//! exclude = ["vendor/**"]
//!
//! [progressive]
//! enabled = false
//!
//! [[bundle]]
//! target = "js/app.js"
//! files = ["js/vendor/*.js", "js/main.js"]
//! ```

mod bundle;
mod error;
mod feature;

pub use bundle::Bundle;
pub use error::ConfigError;
pub use feature::{Feature, Patterns};

use crate::cli::Cli;
use crate::log;
use crate::utils::path::{clean_path, normalize_path, resolve_path};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "compactor.toml";

/// Process-wide build options, immutable once the engine starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Root of the indexed source tree.
    pub source: PathBuf,
    /// Root of the mirrored destination tree.
    pub destination: PathBuf,
    /// Insert content hashes into destination file names.
    pub hashed: bool,
    /// Development mode never compresses.
    pub development: bool,
    /// Source files that are always packages, even when excluded.
    pub include: Patterns,
    /// Source files that are never packages.
    pub exclude: Patterns,
    /// Files that are never indexed at all.
    pub ignore: Patterns,
    pub compress: Feature,
    pub source_map: Feature,
    pub progressive: Feature,
    /// Extensions routed to the generic copy plugin.
    pub disable: Vec<String>,
    /// Seconds before an external tool is killed (0 = unlimited).
    pub timeout: u64,
    #[serde(rename = "bundle")]
    pub bundles: Vec<Bundle>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            source: PathBuf::from("src"),
            destination: PathBuf::from("dist"),
            hashed: true,
            development: false,
            include: Patterns::default(),
            exclude: Patterns::default(),
            ignore: Patterns::default(),
            compress: Feature::default(),
            source_map: Feature::default(),
            progressive: Feature::default(),
            disable: Vec::new(),
            timeout: 60,
            bundles: Vec::new(),
        }
    }
}

impl Options {
    /// Load options from the config file (if any) and apply CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut options, base) = match &cli.config {
            Some(path) => {
                let path = resolve_path(path, &cwd);
                (Self::from_path(&path)?, parent_of(&path, &cwd))
            }
            None => {
                let path = cwd.join(CONFIG_FILE);
                if path.is_file() {
                    (Self::from_path(&path)?, cwd.clone())
                } else {
                    (Self::default(), cwd.clone())
                }
            }
        };

        // Config-file paths are relative to the config file, CLI paths to cwd
        options.source = relative_to_base(&options.source, &base);
        options.destination = relative_to_base(&options.destination, &base);
        options.apply_cli(cli, &cwd)?;
        // Watch events arrive with canonical paths
        options.source = normalize_path(&options.source);
        options.destination = normalize_path(&options.destination);
        options.validate()?;
        Ok(options)
    }

    /// Apply command-line overrides on top of the loaded values.
    pub fn apply_cli(&mut self, cli: &Cli, cwd: &Path) -> Result<(), ConfigError> {
        if let Some(source) = &cli.source {
            self.source = resolve_path(source, cwd);
        }
        if let Some(destination) = &cli.destination {
            self.destination = resolve_path(destination, cwd);
        }
        if let Some(hashed) = cli.hashed {
            self.hashed = hashed;
        }
        if let Some(development) = cli.development {
            self.development = development;
        }
        if let Some(timeout) = cli.timeout {
            self.timeout = timeout;
        }

        self.include.extend(cli.include.iter().cloned());
        self.exclude.extend(cli.exclude.iter().cloned());
        self.ignore.extend(cli.ignore.iter().cloned());

        for switch in &cli.compress {
            self.compress.apply_switch(switch)?;
        }
        for switch in &cli.source_map {
            self.source_map.apply_switch(switch)?;
        }
        for switch in &cli.progressive {
            self.progressive.apply_switch(switch)?;
        }

        self.disable.extend(
            cli.disable
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty()),
        );

        for value in &cli.bundle {
            self.bundles.push(Bundle::parse(value)?);
        }
        Ok(())
    }

    /// Check paths and compile every pattern list.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.source.is_dir() {
            return Err(ConfigError::Validation(format!(
                "source directory `{}` not found",
                self.source.display()
            )));
        }

        let source = normalize_path(&self.source);
        let destination = normalize_path(&self.destination);
        if destination == source || destination.starts_with(&source) {
            return Err(ConfigError::Validation(format!(
                "destination `{}` must not be inside source `{}`",
                destination.display(),
                source.display()
            )));
        }

        self.include.compile()?;
        self.exclude.compile()?;
        self.ignore.compile()?;
        self.compress.validate()?;
        self.source_map.validate()?;
        self.progressive.validate()?;
        for bundle in &self.bundles {
            bundle.validate()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Per-file decisions
    // ------------------------------------------------------------------------

    /// Whether a source file takes part in indexing at all.
    pub fn is_ignored(&self, location: &Path) -> bool {
        self.ignore.is_match(location)
    }

    /// Source include/exclude filter for package selection.
    ///
    /// An include match always passes; otherwise an exclude match rejects.
    pub fn is_selected(&self, location: &Path) -> bool {
        if self.include.is_match(location) {
            return true;
        }
        !self.exclude.is_match(location)
    }

    pub fn should_compress(&self, location: &Path) -> bool {
        !self.development && self.compress.allows(location)
    }

    pub fn should_source_map(&self, location: &Path) -> bool {
        self.source_map.allows(location)
    }

    pub fn should_progressive(&self, location: &Path) -> bool {
        self.progressive.allows(location)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Insert a hash segment when hashing is enabled.
    pub fn to_hashed(&self, path: &Path, hash: &str) -> PathBuf {
        if self.hashed {
            crate::utils::path::to_hashed(path, hash)
        } else {
            path.to_path_buf()
        }
    }

    /// Shorten an absolute path for display (relative to cwd when possible).
    pub fn display_path(&self, path: &Path) -> String {
        for root in [&self.destination, &self.source] {
            if let Ok(rel) = path.strip_prefix(root)
                && let Some(name) = root.file_name()
            {
                return Path::new(name).join(rel).display().to_string();
            }
        }
        path.display().to_string()
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (options, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            print_unknown_fields_warning(&ignored, path);
        }
        Ok(options)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let options = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((options, ignored))
    }
}

/// Config-file paths are relative to the config file's directory only.
fn relative_to_base(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        clean_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}

fn parent_of(path: &Path, fallback: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| fallback.to_path_buf(), Path::to_path_buf)
}

fn print_unknown_fields_warning(fields: &[String], path: &Path) {
    let display_path = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_else(|| path.to_string_lossy());
    log!("warn"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        use clap::Parser;
        let mut full = vec!["compactor"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert!(options.hashed);
        assert!(!options.development);
        assert!(options.compress.enabled);
        assert_eq!(options.timeout, 60);
    }

    #[test]
    fn test_parse_toml() {
        let (options, ignored) = Options::parse_with_ignored(
            r#"
            source = "assets"
            hashed = false
            ignore = ["*.md"]

            [compress]
            exclude = ["vendor/**"]

            [progressive]
            enabled = false
            "#,
        )
        .unwrap();

        assert!(ignored.is_empty());
        assert_eq!(options.source, PathBuf::from("assets"));
        assert!(!options.hashed);
        assert!(options.is_ignored(Path::new("docs/README.md")));
        assert!(!options.should_compress(Path::new("vendor/lib.js")));
        assert!(options.should_compress(Path::new("js/app.js")));
        assert!(!options.should_progressive(Path::new("img/a.png")));
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) = Options::parse_with_ignored(
            r#"
            source = "src"
            minify = true
            "#,
        )
        .unwrap();
        assert_eq!(ignored, vec!["minify"]);
    }

    #[test]
    fn test_development_disables_compress() {
        let options = Options {
            development: true,
            ..Default::default()
        };
        assert!(!options.should_compress(Path::new("app.js")));
        assert!(options.should_source_map(Path::new("app.js")));
    }

    #[test]
    fn test_source_selection() {
        let mut options = Options::default();
        options.exclude.extend(["vendor/**"]);
        options.include.extend(["vendor/keep.js"]);

        assert!(options.is_selected(Path::new("js/app.js")));
        assert!(!options.is_selected(Path::new("vendor/other.js")));
        assert!(options.is_selected(Path::new("vendor/keep.js")));
    }

    #[test]
    fn test_apply_cli_overrides() {
        let dir = TempDir::new().unwrap();
        let mut options = Options::default();

        options
            .apply_cli(
                &cli(&[
                    "--source",
                    "in",
                    "--hashed",
                    "false",
                    "--compress",
                    "false:*.svg",
                    "--disable",
                    ".PNG,jpg",
                    "--timeout",
                    "5",
                    "--bundle",
                    "js/all.js:js/a.js,js/b.js",
                ]),
                dir.path(),
            )
            .unwrap();

        assert!(options.source.ends_with("in"));
        assert!(!options.hashed);
        assert!(!options.should_compress(Path::new("a.svg")));
        assert_eq!(options.disable, vec!["png", "jpg"]);
        assert_eq!(options.timeout(), Duration::from_secs(5));
        assert_eq!(options.bundles.len(), 1);
        assert_eq!(options.bundles[0].target, PathBuf::from("js/all.js"));
    }

    #[test]
    fn test_validate_rejects_nested_destination() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();

        let options = Options {
            source: dir.path().join("src"),
            destination: dir.path().join("src/dist"),
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::Validation(_))
        ));

        let options = Options {
            destination: dir.path().join("dist"),
            ..options
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_source() {
        let dir = TempDir::new().unwrap();
        let options = Options {
            source: dir.path().join("nope"),
            destination: dir.path().join("dist"),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_hash_wrappers_respect_toggle() {
        let mut options = Options::default();
        let path = Path::new("/dist/app.js");
        assert_eq!(options.to_hashed(path, "ab"), PathBuf::from("/dist/app.ab.js"));

        options.hashed = false;
        assert_eq!(options.to_hashed(path, "ab"), path);
    }

    #[test]
    fn test_parse_bundles() {
        let (options, ignored) = Options::parse_with_ignored(
            r#"
            [[bundle]]
            target = "js/all.js"
            files = ["js/vendor/*.js", "js/main.js"]
            "#,
        )
        .unwrap();
        assert!(ignored.is_empty());
        assert_eq!(options.bundles.len(), 1);
        assert_eq!(options.bundles[0].files.as_slice(), ["js/vendor/*.js", "js/main.js"]);
    }

    #[test]
    fn test_invalid_bundle_flag() {
        let mut options = Options::default();
        let err = options
            .apply_cli(&cli(&["--bundle", "js/all.js"]), Path::new("/"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Bundle(_)));
    }

    #[test]
    fn test_config_paths_relative_to_config_dir() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("site");
        assert_eq!(relative_to_base(Path::new("src"), &base), base.join("src"));
        assert_eq!(relative_to_base(Path::new("/abs/./src"), &base), PathBuf::from("/abs/src"));
    }

    #[test]
    fn test_load_ignores_same_named_dir_in_cwd() {
        // The test process runs in the crate root, which has its own `src/`
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("site");
        fs::create_dir_all(site.join("src")).unwrap();
        let config = site.join(CONFIG_FILE);
        fs::write(&config, "source = \"src\"\ndestination = \"dist\"\n").unwrap();

        let options = Options::load(&cli(&["--config", config.to_str().unwrap()])).unwrap();
        assert_eq!(options.source, normalize_path(&site.join("src")));
        assert_eq!(options.destination, normalize_path(&site.join("dist")));
    }
}
