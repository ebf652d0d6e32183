//! Logger options and the shared escalation policy
//!
//! [`Options`] carries the build metadata that is embedded in diagnostics and
//! decides, through [`Options::critical`], whether a failed sanity check only
//! prints a report or also brings the process down.

use std::backtrace::Backtrace;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Release mode of the running binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReleaseType {
    /// Not set. Constructing a logger with this value aborts the process.
    #[default]
    Uninitialized,
    /// Production builds
    Release,
    /// Development builds
    Dev,
    /// Test harness builds. Suppresses stack traces and stderr reports.
    Testing,
    /// A release name that is not recognized
    Other(String),
}

impl ReleaseType {
    /// Get the lowercase name of this release type
    pub fn as_str(&self) -> &str {
        match self {
            ReleaseType::Uninitialized => "uninitialized",
            ReleaseType::Release => "release",
            ReleaseType::Dev => "dev",
            ReleaseType::Testing => "testing",
            ReleaseType::Other(name) => name,
        }
    }

    /// Check if this is one of the three usable release types
    pub fn is_valid(&self) -> bool {
        matches!(
            self,
            ReleaseType::Release | ReleaseType::Dev | ReleaseType::Testing
        )
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let release = match s.trim().to_ascii_lowercase().as_str() {
            "" | "uninitialized" => ReleaseType::Uninitialized,
            "release" => ReleaseType::Release,
            "dev" => ReleaseType::Dev,
            "testing" => ReleaseType::Testing,
            _ => ReleaseType::Other(s.trim().to_string()),
        };
        Ok(release)
    }
}

impl From<String> for ReleaseType {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(release) => release,
            Err(never) => match never {},
        }
    }
}

impl From<ReleaseType> for String {
    fn from(release: ReleaseType) -> Self {
        release.as_str().to_string()
    }
}

/// Logger options
///
/// Immutable once handed to a logger; every logger and closeable file keeps
/// its own copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Name of the binary, used in the startup marker and build info
    pub binary_name: String,
    /// Where users should file bug reports after a critical error
    pub bug_report_url: String,
    /// Enables debug lines and turns severe and critical reports into panics
    pub debug: bool,
    /// Release mode
    pub release: ReleaseType,
    /// Binary version
    pub version: String,
}

impl Options {
    /// Parse options from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load options from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check that the release type can be used for logging
    ///
    /// An uninitialized release type is a developer error and aborts the
    /// process regardless of the debug flag. Any other unknown release type
    /// is returned as an error.
    pub fn validate(&self) -> Result<()> {
        match &self.release {
            ReleaseType::Release | ReleaseType::Dev | ReleaseType::Testing => Ok(()),
            ReleaseType::Uninitialized => abort("uninitialized release type".to_string()),
            ReleaseType::Other(name) => Err(Error::InvalidReleaseType(name.clone())),
        }
    }

    /// Build information embedded in severe and critical reports
    pub fn build_info_string(&self) -> String {
        format!(
            "({} v{}, Release: {})",
            self.binary_name, self.version, self.release
        )
    }

    /// Report a failed sanity check
    ///
    /// Outside of testing builds the call stack and the report are written to
    /// stderr. With `debug` set the process then panics with the report as the
    /// payload; otherwise this returns and the caller carries on.
    pub fn critical(&self, message: impl fmt::Display) {
        let report = format!(
            "Critical error: {} {}\nPlease submit a bug report here: {}\n",
            self.build_info_string(),
            message,
            self.bug_report_url
        );
        self.escalate(report);
    }

    /// Report a severe problem with the user's machine or setup
    pub(crate) fn severe(&self, message: impl fmt::Display) {
        let report = format!("Severe error: {} {}\n", self.build_info_string(), message);
        self.escalate(report);
    }

    fn escalate(&self, report: String) {
        if self.release != ReleaseType::Testing {
            let trace = Backtrace::force_capture();
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", trace);
            let _ = stderr.write_all(report.as_bytes());
        }
        if self.debug {
            abort(report);
        }
    }
}

/// Terminate by panicking with `report` as the payload
///
/// The payload is a `String` so a top-level handler can recover the report
/// with `downcast_ref::<String>()`.
pub fn abort(report: String) -> ! {
    std::panic::panic_any(report)
}

/// Get the base directory for critlog files (~/.critlog)
/// Falls back to ./.critlog if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory");
        PathBuf::from(".critlog")
    })
}

/// Try to get the base directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".critlog"))
}

/// Get the default log file path
pub fn default_log_file() -> PathBuf {
    config_dir().join("critlog.log")
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
