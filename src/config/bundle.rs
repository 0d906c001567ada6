//! Custom bundles: one destination built from several source files.
//!
//! ```toml
//! [[bundle]]
//! target = "js/app.js"
//! files = ["js/vendor/*.js", "js/main.js"]
//! ```
//!
//! On the command line the same bundle is `--bundle js/app.js:js/vendor/*.js,js/main.js`.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use super::{ConfigError, Patterns};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    /// Output location relative to the source root, before hashing.
    pub target: PathBuf,
    /// Member patterns. Members are concatenated in pattern order, then
    /// path order within one pattern.
    pub files: Patterns,
}

impl Bundle {
    /// Parse `target:pattern,pattern`.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let (target, files) = value
            .split_once(':')
            .ok_or_else(|| ConfigError::Bundle(value.to_owned()))?;

        let mut patterns = Patterns::default();
        patterns.extend(files.split(','));
        let bundle = Self {
            target: PathBuf::from(target.trim()),
            files: patterns,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let relative = !self.target.as_os_str().is_empty()
            && self.target.components().all(|c| matches!(c, Component::Normal(_)));
        if !relative || self.files.is_empty() {
            return Err(ConfigError::Bundle(self.target.display().to_string()));
        }
        self.files.compile()?;
        Ok(())
    }

    /// Member order key of `location`, or `None` when it is not a member.
    pub fn member_rank(&self, location: &Path) -> Option<usize> {
        if location == self.target {
            return None;
        }
        self.files.first_match(location)
    }
}
