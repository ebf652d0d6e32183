//! Line-oriented writer behind the logger
//!
//! Every line gets a UTC timestamp with microsecond precision and the
//! `file.rs:line` location of the caller:
//!
//! ```text
//! 2026/01/21 14:30:45.123456 main.rs:42: [ERROR] connection refused
//! ```

use std::fmt;
use std::io::{self, Write};
use std::panic::Location;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

/// A sink that can release its underlying resource
pub trait CloseableWrite: Write + Send {
    /// Release the underlying resource. Must only be called once.
    fn close(&mut self) -> io::Result<()>;
}

/// Destination for formatted log lines
pub enum Sink {
    /// Any byte stream. Closing the logger leaves it open.
    Stream(Box<dyn Write + Send>),
    /// A sink that is closed together with the logger.
    Closeable(Box<dyn CloseableWrite>),
}

impl Sink {
    /// Wrap a plain byte stream
    pub fn stream(writer: impl Write + Send + 'static) -> Self {
        Sink::Stream(Box::new(writer))
    }

    /// Wrap a sink that is closed when the logger closes
    pub fn closeable(writer: impl CloseableWrite + 'static) -> Self {
        Sink::Closeable(Box::new(writer))
    }

    /// Close the sink if it supports closing
    fn close(&mut self) -> Option<io::Result<()>> {
        match self {
            Sink::Stream(_) => None,
            Sink::Closeable(writer) => Some(writer.close()),
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Stream(writer) => writer.write(buf),
            Sink::Closeable(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Stream(writer) => writer.flush(),
            Sink::Closeable(writer) => writer.flush(),
        }
    }
}

/// Values joined by single spaces, as the `*ln` logging methods print them
pub struct Joined<'a>(pub &'a [&'a dyn fmt::Display]);

impl fmt::Display for Joined<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

/// Strip the directories from a source path
fn short_file(file: &str) -> &str {
    file.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(file)
}

/// Format a complete log line, terminated by exactly one newline
pub(crate) fn format_line(now: DateTime<Utc>, location: &Location<'_>, message: &str) -> String {
    let mut line = format!(
        "{} {}:{}: {}",
        now.format("%Y/%m/%d %H:%M:%S%.6f"),
        short_file(location.file()),
        location.line(),
        message
    );
    if !line.ends_with('\n') {
        line.push('\n');
    }
    line
}

/// Serializes whole lines onto a [`Sink`]
pub(crate) struct LineWriter {
    sink: Mutex<Sink>,
}

impl LineWriter {
    pub(crate) fn new(sink: Sink) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Write one line with a single `write_all` so concurrent lines never interleave
    pub(crate) fn output(&self, location: &Location<'_>, message: &str) -> io::Result<()> {
        let line = format_line(Utc::now(), location, message);
        // A debug abort inside the sink poisons the lock; the sink itself is still usable.
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_all(line.as_bytes())
    }

    /// Close the sink, returning `None` when it cannot be closed
    pub(crate) fn close(&self) -> Option<io::Result<()>> {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.close()
    }
}
