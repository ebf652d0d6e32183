//! Logging facade for critlog
//!
//! Provides the severity-tagged [`Logger`], the line writer it formats through,
//! and a file sink that rejects use after close.

mod closeable_file;
mod line_writer;
mod logger;

pub use closeable_file::CloseableFile;
pub use line_writer::{CloseableWrite, Joined, Sink};
pub use logger::{discard, Logger, SHUTDOWN_MARKER, STARTUP_MARKER};
