//! Terminal logging with colored prefixes and in-place status lines.
//!
//! - `log!` / `debug!` macros for prefixed output (`[build] ...`)
//! - `ProgressLine` for the initial full build (`[build] packages(12/40)`)
//! - `WatchStatus` for per-event outcomes in watch mode
//!
//! # Example
//!
//! ```ignore
//! log!("written"; "{}", "css/app.1a2b3c4d5e6f7a8b.css");
//!
//! let progress = ProgressLine::new("packages", 40);
//! progress.inc();
//! progress.finish();
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Global verbose flag (set by --verbose)
static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Whether a progress line currently occupies the last terminal line.
static PROGRESS_ACTIVE: AtomicBool = AtomicBool::new(false);

// ============================================================================
// Log Macros
// ============================================================================

/// Log a message with a colored module prefix
///
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown with --verbose)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Log a message with a colored module prefix.
///
/// When a progress line is active, the message is printed above it and the
/// progress line is left for the next refresh to redraw.
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let mut stdout = stdout().lock();

    if PROGRESS_ACTIVE.load(Ordering::SeqCst) {
        clear_line(&mut stdout);
    } else {
        execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    }

    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "watch" => prefix.bright_green().bold().to_string(),
        "written" => prefix.bright_cyan().bold().to_string(),
        "deleted" => prefix.bright_magenta().bold().to_string(),
        "error" | "failed" => prefix.bright_red().bold().to_string(),
        "warn" => prefix.yellow().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Watch Status
// ============================================================================

/// Current UTC time as HH:MM:SS
fn now() -> String {
    use std::time::SystemTime;
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Status block for watch mode.
///
/// Each message overwrites the previous block, so the terminal shows only the
/// outcome of the latest rebuild.
pub struct WatchStatus {
    last_lines: usize,
}

static WATCH_STATUS: LazyLock<Mutex<WatchStatus>> =
    LazyLock::new(|| Mutex::new(WatchStatus::new()));

impl WatchStatus {
    pub const fn new() -> Self {
        Self { last_lines: 0 }
    }

    /// ✓ prefix, green.
    pub fn success(&mut self, message: &str) {
        self.display(format!("{}", "✓".green()), message);
    }

    /// ✗ prefix, red, with optional detail lines.
    pub fn error(&mut self, summary: &str, detail: &str) {
        let message = if detail.is_empty() {
            summary.to_string()
        } else {
            format!("{summary}\n{detail}")
        };
        self.display(format!("{}", "✗".red()), &message);
    }

    fn display(&mut self, symbol: String, message: &str) {
        let mut stdout = stdout().lock();

        if self.last_lines > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = self.last_lines as u16;
            execute!(stdout, cursor::MoveUp(lines)).ok();
            execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
        }

        let timestamp = format!("[{}]", now()).dimmed().to_string();
        writeln!(stdout, "{timestamp} {symbol} {message}").ok();
        stdout.flush().ok();

        self.last_lines = line_count(message);
    }

    /// Forget the previous block so the next message does not overwrite
    /// interleaved log output.
    pub fn detach(&mut self) {
        self.last_lines = 0;
    }
}

fn line_count(message: &str) -> usize {
    message.matches('\n').count() + 1
}

pub fn status_success(message: &str) {
    WATCH_STATUS.lock().success(message);
}

pub fn status_error(summary: &str, detail: &str) {
    WATCH_STATUS.lock().error(summary, detail);
}

pub fn status_detach() {
    WATCH_STATUS.lock().detach();
}

// ============================================================================
// Progress Line
// ============================================================================

fn clear_line(out: &mut impl Write) {
    execute!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
}

/// Single-line progress counter: `[build] packages(42/69)`.
///
/// `inc` is called from rayon workers; the redraw uses `try_lock` so a busy
/// display never blocks a worker.
pub struct ProgressLine {
    label: &'static str,
    total: usize,
    current: AtomicUsize,
    lock: Mutex<()>,
}

impl ProgressLine {
    pub fn new(label: &'static str, total: usize) -> Self {
        PROGRESS_ACTIVE.store(true, Ordering::SeqCst);
        let progress = Self {
            label,
            total,
            current: AtomicUsize::new(0),
            lock: Mutex::new(()),
        };
        progress.display(false);
        progress
    }

    #[inline]
    pub fn inc(&self) {
        self.current.fetch_add(1, Ordering::Relaxed);
        if let Some(_guard) = self.lock.try_lock() {
            self.display(false);
        }
    }

    fn render(&self) -> String {
        format!(
            "{} {}({}/{})",
            colorize_prefix("build"),
            self.label,
            self.current.load(Ordering::Relaxed),
            self.total
        )
    }

    fn display(&self, newline: bool) {
        let line = self.render();
        let mut stdout = stdout().lock();
        clear_line(&mut stdout);
        if newline {
            writeln!(stdout, "{line}").ok();
        } else {
            write!(stdout, "{line}").ok();
        }
        stdout.flush().ok();
    }

    /// Print the final counts and keep the line.
    pub fn finish(self) {
        {
            let _guard = self.lock.lock();
            self.display(true);
        }
        PROGRESS_ACTIVE.store(false, Ordering::SeqCst);
        std::mem::forget(self);
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        PROGRESS_ACTIVE.store(false, Ordering::SeqCst);
        let mut stdout = stdout().lock();
        clear_line(&mut stdout);
        stdout.flush().ok();
    }
}
