//! Error types for workstack-sync.

use thiserror::Error;

use workstack_channel::ChannelError;
use workstack_core::CoreError;

/// All errors that can arise from coordination operations.
#[derive(Debug, Error)]
pub enum CoordError {
    /// Identity, configuration or work directory could not be set up.
    /// Fatal: no coordination is possible without these.
    #[error("setup error: {0}")]
    Setup(#[from] CoreError),

    /// A channel operation failed or a poll exceeded its maximum wait.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Barrier tags become part of file names.
    #[error("invalid barrier tag {tag:?}: must be non-empty and free of path separators")]
    InvalidTag { tag: String },

    /// A well-known channel was looked up before it was created.
    #[error("channel {tag} is not registered")]
    UnknownChannel { tag: String },
}
