//! The coordination handle and its lifecycle.
//!
//! A host constructs exactly one [`Coordinator`] at process entry, calls
//! [`Coordinator::initialize`] once and passes the handle to whatever needs
//! to synchronize. Initialization runs, in order:
//!
//! 1. resolve the work directory (`<temp_dir>/lib-work-stack[_<job>]`) and
//!    create it, tolerating an existing one;
//! 2. resolve this process's rank from the configured sources;
//! 3. create the well-known channels `LOG_<id>`, `COMMAND`, `WORKERS`,
//!    `REGISTER` and clear this process's log;
//! 4. on the master only, clear `COMMAND`, `WORKERS` and `REGISTER` and
//!    remove barrier files left by an earlier session;
//! 5. sleep the settle delay so peers see the directory and files;
//! 6. run worker registration (see `registration.rs`).
//!
//! Until step 6 has finished every coordination operation is a no-op that
//! reports `false`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::thread::sleep;

use chrono::{SecondsFormat, Utc};
use workstack_channel::{FileChannel, PollPolicy};
use workstack_core::{
    resolve_identity, resolve_job_suffix, CoordConfig, Environment, ProcessEnv, ProcessId,
    ProcessIdentity, WorkSession,
};

use crate::cleanup::{purge_barrier_files, CleanupLedger};
use crate::error::CoordError;

/// Per-process log channel; the file is `LOG_<id>`.
pub const LOG: &str = "LOG";
pub const COMMAND: &str = "COMMAND";
/// Registered worker ids, mirrored from `REGISTER` by the master.
pub const WORKERS: &str = "WORKERS";
pub const REGISTER: &str = "REGISTER";
/// Prefix of the per-round barrier files.
pub const BARRIER_PREFIX: &str = "BARRIER";

pub struct Coordinator {
    pub(crate) config: CoordConfig,
    pub(crate) policy: PollPolicy,
    pub(crate) identity: Option<ProcessIdentity>,
    pub(crate) work_dir: Option<PathBuf>,
    pub(crate) channels: BTreeMap<String, FileChannel>,
    pub(crate) ledger: CleanupLedger,
    pub(crate) registered: Vec<ProcessId>,
    pub(crate) barrier_seq: u64,
    pub(crate) initialized: bool,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("identity", &self.identity)
            .field("work_dir", &self.work_dir)
            .field("registered", &self.registered.len())
            .field("barrier_seq", &self.barrier_seq)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(CoordConfig::default())
    }
}

impl Coordinator {
    /// Build an uninitialized handle. No I/O happens until [`initialize`].
    ///
    /// [`initialize`]: Coordinator::initialize
    pub fn new(config: CoordConfig) -> Self {
        let policy = PollPolicy::new(
            config.poll_interval(),
            config.max_poll_interval(),
            config.max_wait(),
        );
        Self {
            config,
            policy,
            identity: None,
            work_dir: None,
            channels: BTreeMap::new(),
            ledger: CleanupLedger::new(),
            registered: Vec::new(),
            barrier_seq: 0,
            initialized: false,
        }
    }

    /// Initialize against the real process environment.
    pub fn initialize(&mut self, temp_dir: &Path) -> Result<(), CoordError> {
        self.initialize_with(temp_dir, &ProcessEnv)
    }

    /// Initialize with an explicit environment.
    ///
    /// Errors are fatal for the caller: without a rank or a work directory
    /// no further coordination is possible. A second call on an initialized
    /// handle does nothing.
    pub fn initialize_with(
        &mut self,
        temp_dir: &Path,
        env: &dyn Environment,
    ) -> Result<(), CoordError> {
        if self.initialized {
            return Ok(());
        }

        let job_suffix = resolve_job_suffix(self.config.job_id_var.as_deref(), env);
        let work_dir = WorkSession::new(temp_dir, job_suffix).create()?;
        tracing::debug!(work_dir = %work_dir.display(), "work directory ready");

        let identity = resolve_identity(&self.config.rank_sources, env)?;
        tracing::debug!(id = %identity.id(), role = %identity.role(), "identity resolved");

        let id = identity.id().to_string();
        let is_master = identity.is_master();
        self.work_dir = Some(work_dir);
        self.identity = Some(identity);

        self.create_channel(LOG, Some(&id))?;
        self.create_channel(COMMAND, None)?;
        self.create_channel(WORKERS, None)?;
        self.create_channel(REGISTER, None)?;

        self.well_known(LOG)?.clear()?;
        if is_master {
            for tag in [COMMAND, WORKERS, REGISTER] {
                self.well_known(tag)?.clear()?;
            }
            self.purge_previous_rounds();
        }
        sleep(self.config.settle_delay());

        self.register_workers()?;

        self.initialized = true;
        tracing::info!(
            id = %id,
            master = is_master,
            registered = self.registered.len(),
            "coordinator initialized"
        );
        Ok(())
    }

    /// Remove every session-scoped file this handle created. The work
    /// directory itself is left in place.
    ///
    /// The last barrier round's files are kept: peers may still be polling
    /// them for `GOON`. The next master initialization in the same
    /// directory removes them.
    ///
    /// Idempotent; also run on drop.
    pub fn teardown(&mut self) {
        let removed = self.ledger.sweep_final();
        if self.initialized {
            tracing::debug!(removed, "coordinator torn down");
        }
        self.channels.clear();
        self.initialized = false;
    }

    /// Remove barrier files an earlier session left in this directory, so
    /// stale `WAIT` / `GOON` markers cannot release anyone early.
    fn purge_previous_rounds(&self) {
        let Some(dir) = self.work_dir.as_deref() else {
            return;
        };
        match purge_barrier_files(dir) {
            Ok(removed) if !removed.is_empty() => {
                tracing::debug!(count = removed.len(), "removed stale barrier files");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "could not scan for stale barrier files");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Channels
    // -----------------------------------------------------------------------

    /// Create a channel named `tag` backed by `<work_dir>/<tag>[_<suffix>]`.
    ///
    /// Returns `false` if the tag is already taken or no work directory has
    /// been resolved yet.
    pub fn create_channel(&mut self, tag: &str, suffix: Option<&str>) -> Result<bool, CoordError> {
        let Some(work_dir) = self.work_dir.as_ref() else {
            return Ok(false);
        };
        if self.channels.contains_key(tag) {
            return Ok(false);
        }
        let file_name = match suffix.filter(|s| !s.is_empty()) {
            Some(sfx) => format!("{tag}_{sfx}"),
            None => tag.to_string(),
        };
        let path = work_dir.join(file_name);
        self.create_channel_from_file(tag, path)
    }

    /// Create a channel named `tag` backed by an arbitrary file.
    ///
    /// The file is scheduled for removal at teardown. Returns `false` if the
    /// tag is already taken.
    pub fn create_channel_from_file(
        &mut self,
        tag: &str,
        path: PathBuf,
    ) -> Result<bool, CoordError> {
        if self.channels.contains_key(tag) {
            return Ok(false);
        }
        let channel = FileChannel::open(path.clone())?;
        tracing::debug!(tag, path = %path.display(), "channel created");
        self.channels.insert(tag.to_string(), channel);
        self.ledger.track_final(path);
        Ok(true)
    }

    pub fn channel(&self, tag: &str) -> Option<&FileChannel> {
        self.channels.get(tag)
    }

    /// Forget the handle for `tag`. The backing file is left for teardown.
    pub fn delete_channel(&mut self, tag: &str) -> bool {
        self.channels.remove(tag).is_some()
    }

    /// Tags and backing files of every open channel, ordered by tag.
    pub fn channel_tags(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.channels
            .iter()
            .map(|(tag, channel)| (tag.as_str(), channel.path()))
    }

    pub(crate) fn well_known(&self, tag: &str) -> Result<&FileChannel, CoordError> {
        self.channels.get(tag).ok_or_else(|| CoordError::UnknownChannel {
            tag: tag.to_string(),
        })
    }

    /// Append a timestamped line to this process's `LOG_<id>` channel.
    ///
    /// Returns `false` before initialization. Newlines in `message` are
    /// flattened to spaces.
    pub fn log(&self, message: &str) -> Result<bool, CoordError> {
        if !self.initialized {
            return Ok(false);
        }
        let line = format!(
            "{} {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            message.replace(['\r', '\n'], " ")
        );
        self.well_known(LOG)?.push(&line)?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &CoordConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn identity(&self) -> Option<&ProcessIdentity> {
        self.identity.as_ref()
    }

    pub fn rank(&self) -> Option<u32> {
        self.identity.as_ref().map(ProcessIdentity::rank)
    }

    pub fn id(&self) -> Option<&ProcessId> {
        self.identity.as_ref().map(ProcessIdentity::id)
    }

    /// `false` until an identity has been resolved.
    pub fn is_master(&self) -> bool {
        self.identity
            .as_ref()
            .is_some_and(ProcessIdentity::is_master)
    }

    pub fn work_directory(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    /// Size of the registered worker set. Always 0 on workers.
    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }

    /// Registered process ids in drain order. Empty on workers.
    pub fn registered_workers(&self) -> &[ProcessId] {
        &self.registered
    }

    /// Sequence number the next barrier call will use.
    pub fn barrier_sequence(&self) -> u64 {
        self.barrier_seq
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}
