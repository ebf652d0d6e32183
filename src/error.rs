//! Error type for the logging facade

/// Errors returned by logger construction, configuration loading and I/O.
///
/// Lifecycle misuse (writing to or closing a file twice) is not represented
/// here; it is reported through [`Options::critical`](crate::Options::critical).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The release type is not one of release, dev or testing.
    #[error("invalid release type provided: {0}")]
    InvalidReleaseType(String),

    /// Opening, writing, syncing or closing the sink failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The options document could not be parsed.
    #[error("failed to parse logger options: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
