//! Severity-tagged logger
//!
//! Wraps a [`LineWriter`] with the severity methods, the startup and shutdown
//! markers, and the escalation policy of [`Options`].

use std::fmt;
use std::io;
use std::panic::Location;
use std::path::Path;
use std::sync::OnceLock;

use super::closeable_file::CloseableFile;
use super::line_writer::{Joined, LineWriter, Sink};
use crate::config::{Options, ReleaseType};
use crate::error::Result;

const DEBUG_PREFIX: &str = "[DEBUG] ";
const ERROR_PREFIX: &str = "[ERROR] ";
const SEVERE_PREFIX: &str = "SEVERE: ";
const CRITICAL_PREFIX: &str = "CRITICAL: ";

/// Marker written once when a logger is created
pub const STARTUP_MARKER: &str = "STARTUP";
/// Marker written once when a logger is closed
pub const SHUTDOWN_MARKER: &str = "SHUTDOWN";

static DISCARD: OnceLock<Logger> = OnceLock::new();

/// Logger that enforces the behavior configured in its [`Options`]
///
/// No calls should be made after [`Logger::close`]. Every public method is
/// `#[track_caller]`, so the location in each line is the caller's.
pub struct Logger {
    writer: LineWriter,
    options: Options,
}

impl Logger {
    /// Create a logger over `sink` and write the startup marker
    ///
    /// Returns an error for an unknown release type. An uninitialized release
    /// type aborts the process.
    #[track_caller]
    pub fn new(sink: Sink, options: Options) -> Result<Self> {
        options.validate()?;
        let writer = LineWriter::new(sink);
        let message = format!(
            "{}: Logging has started. {} Version {}",
            STARTUP_MARKER, options.binary_name, options.version
        );
        writer.output(Location::caller(), &message)?;
        tracing::debug!(
            binary = %options.binary_name,
            release = %options.release,
            "Logger started"
        );
        Ok(Self { writer, options })
    }

    /// Create a logger that appends to the file at `path`
    ///
    /// The file is created if it does not exist and is closed together with
    /// the logger.
    #[track_caller]
    pub fn open(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        // Checked before opening so a bad release type never creates the file.
        options.validate()?;
        let file = CloseableFile::open(path.as_ref(), options.clone())?;
        Self::new(Sink::closeable(file), options)
    }

    /// Get the options this logger was created with
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Build information embedded in severe and critical reports
    pub fn build_info_string(&self) -> String {
        self.options.build_info_string()
    }

    #[track_caller]
    fn emit(&self, prefix: &str, args: fmt::Arguments<'_>) {
        let message = format!("{}{}", prefix, args);
        let _ = self.writer.output(Location::caller(), &message);
    }

    /// Write `message` without a prefix
    #[track_caller]
    pub fn print(&self, message: impl fmt::Display) {
        self.emit("", format_args!("{}", message));
    }

    /// Write a formatted message without a prefix
    #[track_caller]
    pub fn printf(&self, args: fmt::Arguments<'_>) {
        self.emit("", args);
    }

    /// Write `values` separated by spaces without a prefix
    #[track_caller]
    pub fn println(&self, values: &[&dyn fmt::Display]) {
        self.emit("", format_args!("{}", Joined(values)));
    }

    /// Write a `[DEBUG]` line when debug is enabled
    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        if self.options.debug {
            self.emit(DEBUG_PREFIX, format_args!("{}", message));
        }
    }

    /// Formatted variant of [`Logger::debug`]
    #[track_caller]
    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        if self.options.debug {
            self.emit(DEBUG_PREFIX, args);
        }
    }

    /// Space-joined variant of [`Logger::debug`]
    #[track_caller]
    pub fn debugln(&self, values: &[&dyn fmt::Display]) {
        if self.options.debug {
            self.emit(DEBUG_PREFIX, format_args!("{}", Joined(values)));
        }
    }

    /// Write an `[ERROR]` line with a formatted message
    #[track_caller]
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.emit(ERROR_PREFIX, args);
    }

    /// Write an `[ERROR]` line with `values` separated by spaces
    #[track_caller]
    pub fn errorln(&self, values: &[&dyn fmt::Display]) {
        self.emit(ERROR_PREFIX, format_args!("{}", Joined(values)));
    }

    /// Log a severe problem with the user's machine or setup
    ///
    /// Severe problems should be addressed as soon as possible but do not
    /// require the program to stop. Outside of testing builds the call stack
    /// and a report are written to stderr; with debug enabled the process
    /// panics.
    #[track_caller]
    pub fn severe(&self, message: impl fmt::Display) {
        self.emit(SEVERE_PREFIX, format_args!("{}", message));
        self.options.severe(message);
    }

    /// Log a failed sanity check
    ///
    /// Only for developer errors; use [`Logger::severe`] for problems the
    /// user can fix. See [`Options::critical`] for the escalation.
    #[track_caller]
    pub fn critical(&self, message: impl fmt::Display) {
        self.emit(CRITICAL_PREFIX, format_args!("{}", message));
        self.options.critical(message);
    }

    /// Write the shutdown marker and close the sink if it can be closed
    ///
    /// Must be called at most once.
    #[track_caller]
    pub fn close(&self) -> Result<()> {
        let message = format!("{}: Logging has terminated.", SHUTDOWN_MARKER);
        let written = self.writer.output(Location::caller(), &message);
        tracing::debug!(binary = %self.options.binary_name, "Logger closed");
        match self.writer.close() {
            Some(closed) => Ok(closed?),
            None => Ok(written?),
        }
    }
}

/// Get the shared logger that writes nowhere
///
/// Meant for tests. Debug is enabled, so [`Logger::critical`] and
/// [`Logger::severe`] still panic.
pub fn discard() -> &'static Logger {
    DISCARD.get_or_init(|| Logger {
        writer: LineWriter::new(Sink::stream(io::sink())),
        options: Options {
            binary_name: "discard".to_string(),
            bug_report_url: String::new(),
            debug: true,
            release: ReleaseType::Testing,
            version: "0".to_string(),
        },
    })
}
