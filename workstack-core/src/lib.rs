//! workstack core library — identity, session directory, configuration, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes and the resolved [`ProcessIdentity`]
//! - [`identity`] — ordered rank sources and the [`Environment`] seam
//! - [`session`] — the shared work directory
//! - [`config`] — [`CoordConfig`]
//! - [`error`] — [`CoreError`]

pub mod config;
pub mod error;
pub mod identity;
pub mod session;
pub mod types;

pub use config::CoordConfig;
pub use error::CoreError;
pub use identity::{resolve_identity, resolve_job_suffix, Environment, ProcessEnv, RankSource};
pub use session::{WorkSession, WORK_DIR_NAME};
pub use types::{ProcessId, ProcessIdentity, Role};
