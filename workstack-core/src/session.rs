//! Shared work directory for one coordination session.
//!
//! # Storage layout
//!
//! ```text
//! <temp_dir>/
//!   lib-work-stack[_<job>]/     (mode 0770, created on first init)
//!     LOG_<id>                  (one per process)
//!     COMMAND
//!     WORKERS
//!     REGISTER
//!     BARRIER_cmd_<tag>_<seq>   (ephemeral, one pair per barrier round)
//!     BARRIER_ack_<tag>_<seq>
//! ```
//!
//! The directory is shared by every process of the group and is never
//! removed by the library; other sessions or residual logs may live there.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Base name of the session directory.
pub const WORK_DIR_NAME: &str = "lib-work-stack";

/// Resolved work directory of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSession {
    base_directory: PathBuf,
    job_suffix: Option<String>,
}

impl WorkSession {
    pub fn new(base_directory: impl Into<PathBuf>, job_suffix: Option<String>) -> Self {
        Self {
            base_directory: base_directory.into(),
            job_suffix,
        }
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn job_suffix(&self) -> Option<&str> {
        self.job_suffix.as_deref()
    }

    /// `<base>/lib-work-stack[_<job>]` — pure, no I/O.
    pub fn directory(&self) -> PathBuf {
        let name = match &self.job_suffix {
            Some(job) => format!("{WORK_DIR_NAME}_{job}"),
            None => WORK_DIR_NAME.to_string(),
        };
        self.base_directory.join(name)
    }

    /// Create the session directory (mode `0770`).
    ///
    /// A directory that already exists is not an error; several processes
    /// race to create it. Permissions are only applied by the creator.
    pub fn create(&self) -> Result<PathBuf, CoreError> {
        let dir = self.directory();
        match std::fs::create_dir(&dir) {
            Ok(()) => {
                set_dir_permissions(&dir)?;
                Ok(dir)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(dir),
            Err(source) => Err(CoreError::WorkDir { path: dir, source }),
        }
    }
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o770)).map_err(|source| {
        CoreError::WorkDir {
            path: path.to_path_buf(),
            source,
        }
    })
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
