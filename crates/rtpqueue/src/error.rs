//! Unified error type for rtpqueue.

use std::path::PathBuf;

use rtpqueue_protocol::ProtocolError;
use rtpqueue_queue::QueueError;

/// Failure to load a settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has wrongly typed values.
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `rtpqueue` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum RtpqueueError {
    /// A queue-level error (cooldown, already queued, actor gone).
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// A malformed identifier or destination name.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A settings file could not be loaded.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
