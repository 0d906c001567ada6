//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid glob pattern `{pattern}`")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid switch `{0}`, expected `true`, `false`, `true:<globs>` or `false:<globs>`")]
    Switch(String),

    #[error("Invalid bundle `{0}`, expected `<target>:<globs>` with a relative target")]
    Bundle(String),

    #[error("Config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_config_error_display() {
        let io_err = ConfigError::Io(
            PathBuf::from("compactor.toml"),
            Error::new(ErrorKind::NotFound, "file not found"),
        );
        let display = format!("{io_err}");
        assert!(display.contains("IO error"));
        assert!(display.contains("compactor.toml"));

        let validation = ConfigError::Validation("source directory not found".into());
        assert!(format!("{validation}").contains("source directory not found"));
    }
}
