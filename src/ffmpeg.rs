//! FFmpeg console verbosity.
//!
//! FFmpeg writes its own diagnostics to stderr, independently of the Rust
//! [`log`](https://crates.io/crates/log) facade this crate reports through.
//! [`Manager::set_debug`](crate::Manager::set_debug) toggles between
//! [`LogLevel::Debug`] and [`LogLevel::Quiet`]; [`set_log_level`] gives
//! finer control.
//!
//! ```no_run
//! use mediakit::LogLevel;
//!
//! mediakit::set_log_level(LogLevel::Error);
//! assert_eq!(mediakit::log_level(), Some(LogLevel::Error));
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use ffmpeg_next::util::log::Level;

/// FFmpeg log verbosity, from silent to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    /// Print nothing.
    Quiet,
    /// Only conditions that abort the process.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Suspicious input.
    Warning,
    /// Standard informational output.
    Info,
    /// Detailed informational output.
    Verbose,
    /// Debugging output.
    Debug,
    /// Everything, including per-packet tracing.
    Trace,
}

impl LogLevel {
    const ALL: [LogLevel; 9] = [
        LogLevel::Quiet,
        LogLevel::Panic,
        LogLevel::Fatal,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Verbose,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    fn level(self) -> Level {
        match self {
            LogLevel::Quiet => Level::Quiet,
            LogLevel::Panic => Level::Panic,
            LogLevel::Fatal => Level::Fatal,
            LogLevel::Error => Level::Error,
            LogLevel::Warning => Level::Warning,
            LogLevel::Info => Level::Info,
            LogLevel::Verbose => Level::Verbose,
            LogLevel::Debug => Level::Debug,
            LogLevel::Trace => Level::Trace,
        }
    }
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Quiet => LogLevel::Quiet,
            Level::Panic => LogLevel::Panic,
            Level::Fatal => LogLevel::Fatal,
            Level::Error => LogLevel::Error,
            Level::Warning => LogLevel::Warning,
            Level::Info => LogLevel::Info,
            Level::Verbose => LogLevel::Verbose,
            Level::Debug => LogLevel::Debug,
            Level::Trace => LogLevel::Trace,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Panic => "panic",
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

/// Error returned when parsing an unknown log level name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLogLevelError(String);

impl Display for ParseLogLevelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "unknown log level: {}", self.0)
    }
}

impl std::error::Error for ParseLogLevelError {}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    /// Parse a level name case-insensitively. `warn` is accepted for
    /// [`LogLevel::Warning`].
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("warn") {
            return Ok(LogLevel::Warning);
        }
        LogLevel::ALL
            .into_iter()
            .find(|level| level.to_string().eq_ignore_ascii_case(value))
            .ok_or_else(|| ParseLogLevelError(value.to_string()))
    }
}

/// Set FFmpeg's console verbosity for the whole process.
pub fn set_log_level(level: LogLevel) {
    ffmpeg_next::util::log::set_level(level.level());
}

/// FFmpeg's current console verbosity, or `None` if FFmpeg reports a level
/// with no named counterpart.
pub fn log_level() -> Option<LogLevel> {
    ffmpeg_next::util::log::get_level().ok().map(LogLevel::from)
}
