//! Glob pattern lists and per-feature toggles.
//!
//! Patterns are matched against a file's location (path relative to the
//! source root, forward slashes). A bare extension such as `.png` matches
//! every file with that extension.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use super::ConfigError;
use crate::utils::path::name::to_slash;

/// A list of glob patterns, compiled on first use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patterns {
    raw: Vec<String>,
    #[serde(skip)]
    compiled: OnceLock<GlobSet>,
}

impl Patterns {
    #[cfg(test)]
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            raw: patterns.into_iter().map(Into::into).collect(),
            compiled: OnceLock::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[String] {
        &self.raw
    }

    /// Append patterns, skipping empty entries.
    pub fn extend<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for pattern in patterns {
            let pattern: String = pattern.into();
            let pattern = pattern.trim();
            if !pattern.is_empty() {
                self.raw.push(pattern.to_owned());
            }
        }
        self.compiled = OnceLock::new();
    }

    /// Compile every pattern, reporting the first invalid one.
    pub fn compile(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.raw {
            let glob = GlobBuilder::new(&expand(pattern))
                .literal_separator(false)
                .build()
                .map_err(|source| ConfigError::Glob {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ConfigError::Glob {
            pattern: self.raw.join(","),
            source,
        })
    }

    /// Whether `location` matches any pattern. An empty list matches nothing.
    pub fn is_match(&self, location: &Path) -> bool {
        if self.raw.is_empty() {
            return false;
        }
        let set = self
            .compiled
            .get_or_init(|| self.compile().unwrap_or_else(|_| GlobSet::empty()));
        set.is_match(to_slash(location))
    }

    /// Index of the first pattern matching `location`.
    pub fn first_match(&self, location: &Path) -> Option<usize> {
        if self.raw.is_empty() {
            return None;
        }
        let set = self
            .compiled
            .get_or_init(|| self.compile().unwrap_or_else(|_| GlobSet::empty()));
        set.matches(to_slash(location)).first().copied()
    }
}

/// `.ext` is shorthand for "any file with this extension".
fn expand(pattern: &str) -> String {
    let is_extension = pattern.starts_with('.')
        && pattern.len() > 1
        && !pattern[1..].contains(['.', '/', '*', '?', '[', '{']);
    if is_extension {
        format!("**/*{pattern}")
    } else {
        pattern.to_owned()
    }
}

/// An optional processing feature (compress, source map, progressive).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Feature {
    pub enabled: bool,
    pub include: Patterns,
    pub exclude: Patterns,
}

impl Default for Feature {
    fn default() -> Self {
        Self {
            enabled: true,
            include: Patterns::default(),
            exclude: Patterns::default(),
        }
    }
}

impl Feature {
    /// Decide whether the feature applies to `location`.
    ///
    /// Disabled globally ⇒ off; exclude match ⇒ off; non-empty include list
    /// without a match ⇒ off; otherwise on.
    pub fn allows(&self, location: &Path) -> bool {
        if !self.enabled || self.exclude.is_match(location) {
            return false;
        }
        self.include.is_empty() || self.include.is_match(location)
    }

    /// Apply a command-line switch.
    ///
    /// - `true` / `false`: toggle the feature
    /// - `true:<globs>`: append to the include list
    /// - `false:<globs>`: append to the exclude list
    pub fn apply_switch(&mut self, value: &str) -> Result<(), ConfigError> {
        let (flag, patterns) = match value.split_once(':') {
            Some((flag, patterns)) => (flag, Some(patterns)),
            None => (value, None),
        };
        let enabled = parse_bool(flag).ok_or_else(|| ConfigError::Switch(value.to_owned()))?;

        match patterns {
            Some(patterns) if enabled => self.include.extend(patterns.split(',')),
            Some(patterns) => self.exclude.extend(patterns.split(',')),
            None => self.enabled = enabled,
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.include.compile()?;
        self.exclude.compile()?;
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "on" => Some(true),
        "false" | "f" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_match_location() {
        let patterns = Patterns::new(["vendor/**", "*.min.js"]);
        assert!(patterns.is_match(Path::new("vendor/jquery/jquery.js")));
        assert!(patterns.is_match(Path::new("js/app.min.js")));
        assert!(!patterns.is_match(Path::new("js/app.js")));
    }

    #[test]
    fn test_patterns_extension_shorthand() {
        let patterns = Patterns::new([".svg"]);
        assert!(patterns.is_match(Path::new("img/icons/home.svg")));
        assert!(patterns.is_match(Path::new("logo.svg")));
        assert!(!patterns.is_match(Path::new("img/logo.png")));
    }

    #[test]
    fn test_empty_patterns_match_nothing() {
        assert!(!Patterns::default().is_match(Path::new("anything.css")));
    }

    #[test]
    fn test_first_match_follows_pattern_order() {
        let patterns = Patterns::new(["js/lib/*.js", "js/*.js"]);
        assert_eq!(patterns.first_match(Path::new("js/lib/a.js")), Some(0));
        assert_eq!(patterns.first_match(Path::new("js/app.js")), Some(1));
        assert_eq!(patterns.first_match(Path::new("css/app.css")), None);
        assert_eq!(Patterns::default().first_match(Path::new("js/app.js")), None);
    }

    #[test]
    fn test_invalid_glob_reported() {
        let patterns = Patterns::new(["a[b"]);
        assert!(matches!(patterns.compile(), Err(ConfigError::Glob { .. })));
    }

    #[test]
    fn test_feature_precedence() {
        let mut feature = Feature::default();
        assert!(feature.allows(Path::new("css/app.css")));

        feature.exclude.extend(["vendor/**"]);
        assert!(!feature.allows(Path::new("vendor/lib.css")));
        assert!(feature.allows(Path::new("css/app.css")));

        feature.include.extend(["*.css"]);
        assert!(feature.allows(Path::new("css/app.css")));
        assert!(!feature.allows(Path::new("js/app.js")));
        // Exclude beats include
        assert!(!feature.allows(Path::new("vendor/lib.css")));

        feature.enabled = false;
        assert!(!feature.allows(Path::new("css/app.css")));
    }

    #[test]
    fn test_apply_switch() {
        let mut feature = Feature::default();

        feature.apply_switch("false").unwrap();
        assert!(!feature.enabled);

        feature.apply_switch("true").unwrap();
        assert!(feature.enabled);

        feature.apply_switch("true:*.css,*.js").unwrap();
        assert_eq!(feature.include.as_slice(), ["*.css", "*.js"]);

        feature.apply_switch("false:vendor/**").unwrap();
        assert_eq!(feature.exclude.as_slice(), ["vendor/**"]);
        assert!(feature.enabled);

        assert!(feature.apply_switch("maybe").is_err());
    }

    #[test]
    fn test_feature_from_toml() {
        let feature: Feature = toml::from_str(
            r#"
            enabled = true
            exclude = ["*.svg"]
            "#,
        )
        .unwrap();
        assert!(!feature.allows(Path::new("img/a.svg")));
        assert!(feature.allows(Path::new("img/a.png")));
    }
}
