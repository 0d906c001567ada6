//! External transformer invocation.
//!
//! Builder-based API for running tools like `sass` or `tsc` with a bounded
//! wall-clock timeout, so a stuck child process cannot stall the watch loop.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! Cmd::new("sass")
//!     .args(["--style=compressed", "in.scss", "out.css"])
//!     .cwd(root)
//!     .timeout(Duration::from_secs(60))
//!     .run()?;
//! ```

use crate::log;
use anyhow::{Context, Result, bail};
use dashmap::DashMap;
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    io::Read,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Output, Stdio},
    sync::{LazyLock, OnceLock},
    thread,
    time::{Duration, Instant},
};

/// Poll interval while waiting on a child with a deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
    filter: Option<&'static FilterRule>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Add a single argument. Empty arguments are skipped.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments. Empty arguments are skipped.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Kill the process and fail if it runs longer than `timeout`.
    ///
    /// A zero duration means no limit.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Set output filter for logging.
    pub fn filter(mut self, filter: &'static FilterRule) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Execute the command and return its output.
    ///
    /// Fails when the process cannot be spawned, exits non-zero, or exceeds
    /// the configured timeout.
    pub fn run(self) -> Result<Output> {
        let name = self.program.to_string_lossy().into_owned();
        let filter = self.filter.unwrap_or(&EMPTY_FILTER);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn `{name}`"))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait(&mut child, self.timeout, &name)?;

        let output = Output {
            status,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        };

        if !output.status.success() {
            bail!(format_error(&name, &output, filter));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        filter.log(&name, stderr.trim());
        Ok(output)
    }
}

/// Read a child pipe to the end on a separate thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Wait for the child, killing it once the deadline passes.
fn wait(child: &mut Child, timeout: Option<Duration>, name: &str) -> Result<ExitStatus> {
    let Some(timeout) = timeout else {
        return child
            .wait()
            .with_context(|| format!("Failed to wait for `{name}`"));
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("Failed to wait for `{name}`"))?
        {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            bail!("Command `{name}` timed out after {}s", timeout.as_secs_f32());
        }
        thread::sleep(POLL_INTERVAL);
    }
}

// ============================================================================
// Tool Availability
// ============================================================================

/// Cached `which` lookups, one per program for the process lifetime.
static TOOLS: LazyLock<DashMap<String, Option<PathBuf>>> = LazyLock::new(DashMap::new);

/// Ensure `program` is reachable on `PATH`.
///
/// The lookup runs once per program; later calls return the cached result.
pub fn require(program: &str) -> Result<PathBuf> {
    let found = TOOLS
        .entry(program.to_owned())
        .or_insert_with(|| which::which(program).ok())
        .clone();

    found.with_context(|| format!("`{program}` not found in PATH"))
}

// ============================================================================
// Output Filtering
// ============================================================================

/// Filter rule for command output logging.
///
/// Used to reduce noise by skipping known warnings or irrelevant messages.
pub struct FilterRule {
    /// Prefixes to skip when logging output.
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    fn should_skip(&self, line: &str) -> bool {
        line.is_empty() || self.skip_prefixes.iter().any(|p| line.starts_with(p))
    }

    /// Log output lines that pass the filter.
    pub fn log(&self, name: &str, output: &str) {
        let lines: Vec<_> = output
            .lines()
            .filter(|line| {
                let plain = strip_ansi(line);
                !self.should_skip(plain.trim())
            })
            .collect();

        if !lines.is_empty() {
            log!(name; "{}", lines.join("\n"));
        }
    }
}

/// Empty filter (no skipping).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);

// ============================================================================
// Helpers
// ============================================================================

fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    match RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").ok()) {
        Some(re) => re.replace_all(s, ""),
        None => std::borrow::Cow::Borrowed(s),
    }
}

fn format_error(name: &str, output: &Output, filter: &'static FilterRule) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let error_msg = filter
        .skip_prefixes
        .iter()
        .fold(stderr.trim(), |s, p| s.trim_start_matches(p).trim_start());

    let mut msg = format!("Command `{name}` failed with {}\n", output.status);
    if !error_msg.is_empty() {
        msg.push_str(error_msg);
    }

    let stdout = stdout.trim();
    if !stdout.is_empty() {
        msg.push_str("\nStdout:\n");
        msg.push_str(stdout);
    }
    msg
}
