//! Error types for workstack-channel.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// All errors that can arise from channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// An I/O error on the backing file, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Entries are newline-delimited: they must be non-empty and contain
    /// no `\n` or `\r`.
    #[error("invalid channel entry {value:?}: must be non-empty and free of line breaks")]
    InvalidValue { value: String },

    /// The backing file was removed, typically by cleanup.
    #[error("channel file {path} no longer exists")]
    Missing { path: PathBuf },

    /// A poll gave up after the configured maximum wait.
    #[error("timed out after {waited:?} waiting on {path}")]
    Timeout { path: PathBuf, waited: Duration },
}

/// Convenience constructor for [`ChannelError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ChannelError {
    ChannelError::Io {
        path: path.into(),
        source,
    }
}
