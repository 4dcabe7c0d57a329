//! Two-phase barrier over per-round channel files.
//!
//! For round `(tag, seq)` the files are `BARRIER_cmd_<tag>_<seq>` and
//! `BARRIER_ack_<tag>_<seq>`. Names derive purely from local state, so every
//! process must issue barrier calls in the same tag order.
//!
//! 1. Arrival: the master resets both files and pushes `WAIT` onto `cmd`.
//!    Everyone waits for `WAIT`, then pushes its id onto `ack`.
//! 2. Release: the master waits until `ack` holds the registered count,
//!    then pushes `GOON`. Everyone waits for `GOON` and returns.
//!
//! No process sees `GOON` for a round before every registered process has
//! pushed its arrival for that round. A registered process that never calls
//! the barrier blocks the group forever unless `max_wait_ms` is set.

use std::path::PathBuf;

use workstack_channel::FileChannel;

use crate::coordinator::{Coordinator, BARRIER_PREFIX};
use crate::error::CoordError;

/// Arrival marker.
pub const WAIT: &str = "WAIT";
/// Release marker.
pub const GOON: &str = "GOON";

impl Coordinator {
    /// Block until every registered process has reached this barrier.
    ///
    /// Returns `Ok(false)` without touching any file when the handle was
    /// never initialized; callers must not assume synchronization then. The
    /// sequence counter advances on every call, whatever the outcome.
    pub fn barrier(&mut self, tag: &str) -> Result<bool, CoordError> {
        let seq = self.barrier_seq;
        self.barrier_seq += 1;

        if !self.initialized {
            return Ok(false);
        }
        validate_tag(tag)?;
        let (Some(cmd_path), Some(ack_path)) = (
            self.barrier_file("cmd", tag, seq),
            self.barrier_file("ack", tag, seq),
        ) else {
            return Ok(false);
        };
        let cmd = FileChannel::open(cmd_path.clone())?;
        let ack = FileChannel::open(ack_path.clone())?;

        let outcome = self.run_round(&cmd, &ack, tag, seq);
        if self.is_master() {
            match &outcome {
                Ok(()) => self.ledger.schedule_round([cmd_path, ack_path]),
                // Peers may still poll the previous round; only queue this one.
                Err(_) => self.ledger.defer_round([cmd_path, ack_path]),
            }
        }
        outcome.map(|()| true)
    }

    fn run_round(
        &self,
        cmd: &FileChannel,
        ack: &FileChannel,
        tag: &str,
        seq: u64,
    ) -> Result<(), CoordError> {
        let is_master = self.is_master();
        let id = self
            .id()
            .map(|id| id.to_string())
            .unwrap_or_default();

        if is_master {
            ack.clear()?;
            cmd.clear()?;
            cmd.push(WAIT)?;
        }
        cmd.poll_query(WAIT, &self.policy)?;
        ack.push(&id)?;
        tracing::debug!(tag, seq, "barrier arrived");

        if is_master {
            let quorum = self.registered.len();
            ack.poll_size(quorum, &self.policy)?;
            cmd.push(GOON)?;
        }
        cmd.poll_query(GOON, &self.policy)?;
        tracing::debug!(tag, seq, "barrier released");
        Ok(())
    }

    /// `<work_dir>/BARRIER_<step>_<tag>_<seq>`; `None` before a work
    /// directory has been resolved.
    pub fn barrier_file(&self, step: &str, tag: &str, seq: u64) -> Option<PathBuf> {
        self.work_dir
            .as_ref()
            .map(|dir| dir.join(format!("{BARRIER_PREFIX}_{step}_{tag}_{seq}")))
    }
}

fn validate_tag(tag: &str) -> Result<(), CoordError> {
    if tag.is_empty() || tag.contains(['/', '\\', '\0']) {
        return Err(CoordError::InvalidTag {
            tag: tag.to_string(),
        });
    }
    Ok(())
}
