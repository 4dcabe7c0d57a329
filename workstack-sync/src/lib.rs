//! # workstack-sync
//!
//! Rank discovery, worker registration and a repeatable barrier for
//! processes that share nothing but a directory.
//!
//! ```no_run
//! use std::path::Path;
//! use workstack_core::CoordConfig;
//! use workstack_sync::Coordinator;
//!
//! # fn main() -> Result<(), workstack_sync::CoordError> {
//! let mut coord = Coordinator::new(CoordConfig::default());
//! coord.initialize(Path::new("/scratch"))?;
//! for step in 0..3 {
//!     // ... work ...
//!     assert!(coord.barrier(&format!("step{step}"))?);
//! }
//! coord.teardown();
//! # Ok(())
//! # }
//! ```

pub mod barrier;
pub mod cleanup;
pub mod coordinator;
pub mod error;
mod registration;

pub use barrier::{GOON, WAIT};
pub use cleanup::{purge_barrier_files, purge_session, stale_session_files, CleanupLedger};
pub use coordinator::{Coordinator, BARRIER_PREFIX, COMMAND, LOG, REGISTER, WORKERS};
pub use error::CoordError;
