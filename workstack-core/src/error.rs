//! Error types for workstack-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while resolving identity, configuration and the
/// work directory. Every variant is fatal for startup.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No configured rank source was present in the environment.
    #[error(
        "could not determine the parallel rank; set it via one of: {}",
        .sources.join(", ")
    )]
    RankUnresolved { sources: Vec<String> },

    /// A rank source was present but did not hold a non-negative integer.
    #[error("invalid rank {value:?} from {source_name}: expected a non-negative integer")]
    InvalidRank { source_name: String, value: String },

    /// The session work directory could not be created.
    #[error("could not create work directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Underlying I/O failure with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on config load — includes the file path.
    #[error("failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the given path.
    #[error("config not found at {path}")]
    ConfigNotFound { path: PathBuf },
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
