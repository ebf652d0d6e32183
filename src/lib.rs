//! critlog - Release-mode aware logging facade
//!
//! Severity-tagged logging whose severe and critical paths panic in debug
//! builds and only report in production builds.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Options, ReleaseType};
pub use error::{Error, Result};
pub use logging::{discard, CloseableFile, CloseableWrite, Logger, Sink};
