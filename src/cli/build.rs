//! One-shot build and result reporting.

use anyhow::{Result, bail};

use crate::config::Options;
use crate::engine::{BuildError, BuildReport, Engine};
use crate::log;
use crate::utils::plural::{join_counts, plural_count};

/// Totals over a set of package builds.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub packages: usize,
    pub written: usize,
    pub deleted: usize,
    /// One formatted line per failed package.
    pub errors: Vec<String>,
}

impl Summary {
    pub fn collect(results: &[Result<BuildReport, BuildError>], options: &Options) -> Self {
        let mut summary = Self {
            packages: results.len(),
            ..Self::default()
        };
        for result in results {
            match result {
                Ok(report) => {
                    summary.written += report.written.len();
                    summary.deleted += report.deleted.len();
                }
                Err(err) => summary.errors.push(format_error(err, options)),
            }
        }
        summary
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// `3 packages, 4 files written, 1 file deleted`
    pub fn message(&self) -> String {
        let mut parts = vec![plural_count(self.packages, "package")];
        let counts = join_counts(&[
            (self.written, "file", "written"),
            (self.deleted, "file", "deleted"),
        ]);
        if !counts.is_empty() {
            parts.push(counts);
        }
        parts.join(", ")
    }

    pub fn failure_line(&self) -> String {
        format!("{} of {} failed", self.errors.len(), plural_count(self.packages, "package"))
    }

    pub fn error_detail(&self) -> Option<String> {
        (!self.errors.is_empty()).then(|| self.errors.join("\n"))
    }
}

fn format_error(err: &BuildError, options: &Options) -> String {
    format!(
        "{} failed for {}: {:#}",
        err.stage,
        options.display_path(&err.path),
        err.source
    )
}

/// One `[written]` / `[deleted]` line per artifact. Returns whether
/// anything was logged.
pub fn log_artifacts(results: &[Result<BuildReport, BuildError>], options: &Options) -> bool {
    let mut logged = false;
    for report in results.iter().flatten() {
        for path in &report.written {
            log!("written"; "{}", options.display_path(path));
            logged = true;
        }
        for path in &report.deleted {
            log!("deleted"; "{}", options.display_path(path));
            logged = true;
        }
    }
    logged
}

/// Log a build outcome: every artifact, one line per failure, then the totals.
pub fn report(results: &[Result<BuildReport, BuildError>], options: &Options) -> Summary {
    let summary = Summary::collect(results, options);
    log_artifacts(results, options);
    for line in &summary.errors {
        log!("error"; "{}", line);
    }
    if summary.is_success() {
        log!("build"; "{}", summary.message());
    } else {
        log!("build"; "{}", summary.failure_line());
    }
    summary
}

/// Build every package once. Fails if any package failed.
pub fn run(engine: &Engine) -> Result<()> {
    let results = engine.build_all();
    let summary = report(&results, engine.options());
    engine.shutdown();

    if !summary.is_success() {
        bail!("build failed: {}", plural_count(summary.errors.len(), "error"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Stage;
    use std::path::PathBuf;

    fn options() -> Options {
        Options {
            source: PathBuf::from("/p/src"),
            destination: PathBuf::from("/p/dist"),
            ..Options::default()
        }
    }

    fn ok(written: usize, deleted: usize) -> Result<BuildReport, BuildError> {
        Ok(BuildReport {
            package: PathBuf::from("/p/src/a.css"),
            written: (0..written).map(|i| PathBuf::from(format!("/p/dist/{i}"))).collect(),
            deleted: (0..deleted).map(|i| PathBuf::from(format!("/p/dist/old{i}"))).collect(),
        })
    }

    #[test]
    fn test_summary_message() {
        let results = vec![ok(2, 0), ok(1, 1), ok(0, 0)];
        let summary = Summary::collect(&results, &options());
        assert!(summary.is_success());
        assert_eq!(summary.message(), "3 packages, 3 files written, 1 file deleted");

        let summary = Summary::collect(&[ok(0, 0)], &options());
        assert_eq!(summary.message(), "1 package");
    }

    #[test]
    fn test_summary_errors() {
        let results = vec![
            ok(1, 0),
            Err(BuildError {
                path: PathBuf::from("/p/src/data.json"),
                stage: Stage::Optimize,
                source: anyhow::anyhow!("Invalid JSON in data.json"),
            }),
        ];
        let summary = Summary::collect(&results, &options());

        assert!(!summary.is_success());
        assert_eq!(summary.failure_line(), "1 of 2 packages failed");
        assert_eq!(
            summary.error_detail().unwrap(),
            "optimize failed for src/data.json: Invalid JSON in data.json"
        );
    }
}
