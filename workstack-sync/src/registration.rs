//! Worker registration.
//!
//! Every process pushes its id onto `REGISTER` and sleeps the registration
//! delay. The master then drains `REGISTER` once, mirroring each id into
//! `WORKERS` and into the in-memory registered set that later serves as the
//! barrier quorum. The group size never has to be known up front.
//!
//! The drain happens after a fixed delay, not after a quorum signal: a
//! process that registers after the drain is never counted and the set is
//! not updated for the rest of the session.

use std::thread::sleep;

use workstack_core::ProcessId;

use crate::coordinator::{Coordinator, REGISTER, WORKERS};
use crate::error::CoordError;

impl Coordinator {
    /// Announce this process and, on the master, collect the worker set.
    ///
    /// Returns the number of ids drained by this call (always 0 on workers).
    pub(crate) fn register_workers(&mut self) -> Result<usize, CoordError> {
        let Some(identity) = self.identity.clone() else {
            return Ok(0);
        };
        tracing::debug!(id = %identity.id(), "registering");
        self.well_known(REGISTER)?.push(identity.id().as_str())?;
        sleep(self.config.registration_delay());

        if !identity.is_master() {
            return Ok(0);
        }

        let mut drained = 0;
        while let Some(id) = self.well_known(REGISTER)?.pop()? {
            self.well_known(WORKERS)?.push(&id)?;
            self.registered.push(ProcessId::from(id));
            drained += 1;
        }
        tracing::debug!(n_registered = self.registered.len(), "registration drained");
        Ok(drained)
    }
}
