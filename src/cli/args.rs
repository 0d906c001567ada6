//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::path::PathBuf;

/// Compactor asset build engine CLI
#[derive(Parser, Debug, Clone, Default)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: compactor.toml, optional)
    #[arg(short = 'C', long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Path of project source files [default: src]
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub source: Option<PathBuf>,

    /// Path to the destination folder [default: dist]
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub destination: Option<PathBuf>,

    /// Watch the source folder and rebuild on changes
    #[arg(short, long)]
    pub watch: bool,

    /// Insert content hashes into destination file names
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub hashed: Option<bool>,

    /// Development mode: never compress
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub development: Option<bool>,

    /// Only include matching files (comma separated globs)
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Exclude matching files (comma separated globs)
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Never index matching files (comma separated globs)
    #[arg(long, value_delimiter = ',')]
    pub ignore: Vec<String>,

    /// Compress or minify output: `true`, `false`, `true:<globs>`, `false:<globs>`
    #[arg(long, value_name = "SWITCH")]
    pub compress: Vec<String>,

    /// Generate source maps: `true`, `false`, `true:<globs>`, `false:<globs>`
    #[arg(long, value_name = "SWITCH")]
    pub source_map: Vec<String>,

    /// Generate progressive formats: `true`, `false`, `true:<globs>`, `false:<globs>`
    #[arg(long, value_name = "SWITCH")]
    pub progressive: Vec<String>,

    /// Extensions whose plugin is disabled (falls back to plain copy)
    #[arg(long, value_delimiter = ',', value_name = "EXT")]
    pub disable: Vec<String>,

    /// Concatenate matching files into one output: `<target>:<globs>` (repeatable)
    #[arg(long, value_name = "TARGET:GLOBS")]
    pub bundle: Vec<String>,

    /// Timeout in seconds for external tools (0 = unlimited)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,
}
