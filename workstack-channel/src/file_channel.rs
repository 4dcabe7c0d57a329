//! File-backed FIFO channel.
//!
//! ## On-disk format
//!
//! One entry per line, oldest first. Entries are non-empty and contain no
//! `\n` or `\r`. Only [`FileChannel::open`] creates the backing file: a
//! missing file reads as an empty channel and rejects pushes, so nothing
//! recreates files that cleanup already removed.
//!
//! ## Locking
//!
//! Every operation opens the backing file, takes an advisory `fs4` lock and
//! drops it when the handle closes:
//!
//! | operation                        | lock      |
//! |----------------------------------|-----------|
//! | `push`, `pop`, `clear`           | exclusive |
//! | `entries`, `size`, `contains`    | shared    |
//!
//! `pop` rewrites the remainder in place rather than via rename so the lock
//! always guards the inode other processes have open.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;

use crate::error::{io_err, ChannelError};
use crate::poll::PollPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChannel {
    path: PathBuf,
}

impl FileChannel {
    /// Open the channel at `path`, creating an empty backing file if none
    /// exists. Existing entries are kept.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ChannelError> {
        let path = path.into();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `value` as the newest entry.
    ///
    /// Values must be non-empty and free of line breaks. The backing file
    /// must still exist: pushing onto a channel whose file cleanup already
    /// removed is [`ChannelError::Missing`].
    pub fn push(&self, value: &str) -> Result<(), ChannelError> {
        if value.is_empty() || value.contains(['\n', '\r']) {
            return Err(ChannelError::InvalidValue {
                value: value.to_owned(),
            });
        }
        let mut file = match OpenOptions::new().append(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ChannelError::Missing {
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(self.io(e)),
        };
        file.lock_exclusive().map_err(|e| self.io(e))?;
        file.write_all(format!("{value}\n").as_bytes())
            .map_err(|e| self.io(e))?;
        file.sync_data().map_err(|e| self.io(e))?;
        tracing::trace!(path = %self.path.display(), value, "push");
        Ok(())
    }

    /// Remove and return the oldest entry, or `None` if the channel is empty.
    pub fn pop(&self) -> Result<Option<String>, ChannelError> {
        let Some(mut file) = self.open_existing(true)? else {
            return Ok(None);
        };
        file.lock_exclusive().map_err(|e| self.io(e))?;

        let mut entries = read_entries(&mut file).map_err(|e| self.io(e))?;
        if entries.is_empty() {
            return Ok(None);
        }
        let head = entries.remove(0);

        let mut rest = String::new();
        for entry in &entries {
            rest.push_str(entry);
            rest.push('\n');
        }
        file.set_len(0).map_err(|e| self.io(e))?;
        file.seek(SeekFrom::Start(0)).map_err(|e| self.io(e))?;
        file.write_all(rest.as_bytes()).map_err(|e| self.io(e))?;
        file.sync_data().map_err(|e| self.io(e))?;

        tracing::trace!(path = %self.path.display(), value = %head, "pop");
        Ok(Some(head))
    }

    /// All pending entries, oldest first.
    pub fn entries(&self) -> Result<Vec<String>, ChannelError> {
        let Some(mut file) = self.open_existing(false)? else {
            return Ok(Vec::new());
        };
        file.lock_shared().map_err(|e| self.io(e))?;
        read_entries(&mut file).map_err(|e| self.io(e))
    }

    pub fn size(&self) -> Result<usize, ChannelError> {
        Ok(self.entries()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ChannelError> {
        Ok(self.size()? == 0)
    }

    pub fn contains(&self, value: &str) -> Result<bool, ChannelError> {
        Ok(self.entries()?.iter().any(|entry| entry == value))
    }

    /// Drop every entry. A missing backing file is left missing.
    pub fn clear(&self) -> Result<(), ChannelError> {
        let Some(file) = self.open_existing(true)? else {
            return Ok(());
        };
        file.lock_exclusive().map_err(|e| self.io(e))?;
        file.set_len(0).map_err(|e| self.io(e))?;
        file.sync_data().map_err(|e| self.io(e))?;
        Ok(())
    }

    /// Block until `value` is among the pending entries.
    pub fn poll_query(&self, value: &str, policy: &PollPolicy) -> Result<(), ChannelError> {
        policy.wait_until(&self.path, || self.contains(value))
    }

    /// Block until at least `n` entries are pending; returns the size seen.
    pub fn poll_size(&self, n: usize, policy: &PollPolicy) -> Result<usize, ChannelError> {
        let mut seen = 0;
        policy.wait_until(&self.path, || {
            seen = self.size()?;
            Ok(seen >= n)
        })?;
        Ok(seen)
    }

    fn open_existing(&self, write: bool) -> Result<Option<File>, ChannelError> {
        match OpenOptions::new().read(true).write(write).open(&self.path) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io(e)),
        }
    }

    fn io(&self, source: std::io::Error) -> ChannelError {
        io_err(&self.path, source)
    }
}

/// Best-effort removal of a channel's backing file.
///
/// Returns `true` if a file was removed. Missing files and other failures
/// are not errors; the latter are logged at debug level.
pub fn remove_backing_file(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "could not remove channel file");
            false
        }
    }
}

fn read_entries(file: &mut File) -> std::io::Result<Vec<String>> {
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn channel(dir: &TempDir, name: &str) -> FileChannel {
        FileChannel::open(dir.path().join(name)).expect("open channel")
    }

    #[test]
    fn open_creates_empty_file_and_keeps_existing_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("WORKERS");
        std::fs::write(&path, "rank_0\n").unwrap();
        let ch = FileChannel::open(&path).unwrap();
        assert_eq!(ch.entries().unwrap(), vec!["rank_0".to_string()]);

        let fresh = channel(&dir, "REGISTER");
        assert!(fresh.path().exists());
        assert!(fresh.is_empty().unwrap());
    }

    #[test]
    fn pop_is_fifo() {
        let dir = TempDir::new().unwrap();
        let ch = channel(&dir, "REGISTER");
        for v in ["a", "b", "c"] {
            ch.push(v).unwrap();
        }
        assert_eq!(ch.pop().unwrap().as_deref(), Some("a"));
        assert_eq!(ch.pop().unwrap().as_deref(), Some("b"));
        ch.push("d").unwrap();
        assert_eq!(ch.pop().unwrap().as_deref(), Some("c"));
        assert_eq!(ch.pop().unwrap().as_deref(), Some("d"));
        assert_eq!(ch.pop().unwrap(), None);
    }

    #[test]
    fn clear_empties_channel() {
        let dir = TempDir::new().unwrap();
        let ch = channel(&dir, "COMMAND");
        ch.push("WAIT").unwrap();
        ch.push("GOON").unwrap();
        ch.clear().unwrap();
        assert_eq!(ch.size().unwrap(), 0);
        assert!(ch.path().exists(), "clear keeps the backing file");
    }

    #[test]
    fn newline_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let ch = channel(&dir, "LOG_rank_0");
        let err = ch.push("two\nlines").unwrap_err();
        assert!(matches!(err, ChannelError::InvalidValue { .. }));
        assert!(ch.is_empty().unwrap());
    }

    #[test]
    fn empty_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let ch = channel(&dir, "REGISTER");
        let err = ch.push("").unwrap_err();
        assert!(matches!(err, ChannelError::InvalidValue { .. }));
        assert_eq!(ch.size().unwrap(), 0);
    }

    #[test]
    fn carriage_returns_are_rejected() {
        let dir = TempDir::new().unwrap();
        let ch = channel(&dir, "REGISTER");
        for value in ["abc\r", "a\rb"] {
            let err = ch.push(value).unwrap_err();
            assert!(matches!(err, ChannelError::InvalidValue { .. }), "{value:?}");
        }
        assert!(ch.is_empty().unwrap());
    }

    #[test]
    fn pushed_values_come_back_unchanged() {
        let dir = TempDir::new().unwrap();
        let ch = channel(&dir, "LOG_rank_0");
        let value = "  2024-01-01T00:00:00.000Z\tstep one  ";
        ch.push(value).unwrap();
        assert_eq!(ch.size().unwrap(), 1);
        assert_eq!(ch.pop().unwrap().as_deref(), Some(value));
    }

    #[test]
    fn missing_file_reads_as_empty_and_is_not_recreated() {
        let dir = TempDir::new().unwrap();
        let ch = channel(&dir, "BARRIER_ack_x_0");
        std::fs::remove_file(ch.path()).unwrap();

        assert_eq!(ch.size().unwrap(), 0);
        assert!(!ch.contains("rank_0").unwrap());
        assert_eq!(ch.pop().unwrap(), None);
        ch.clear().unwrap();
        let err = ch.push("rank_0").unwrap_err();
        assert!(matches!(err, ChannelError::Missing { .. }), "got: {err}");
        assert!(!ch.path().exists());
    }

    #[test]
    fn poll_query_sees_value_pushed_later() {
        let dir = TempDir::new().unwrap();
        let ch = channel(&dir, "BARRIER_cmd_x_0");
        let writer = ch.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            writer.push("WAIT").unwrap();
        });
        let policy = PollPolicy::new(Duration::from_millis(1), Duration::from_millis(5), None);
        ch.poll_query("WAIT", &policy).expect("poll");
        handle.join().unwrap();
    }

    #[test]
    fn poll_size_times_out_with_max_wait() {
        let dir = TempDir::new().unwrap();
        let ch = channel(&dir, "BARRIER_ack_x_0");
        ch.push("rank_0").unwrap();
        let policy = PollPolicy::new(
            Duration::from_millis(1),
            Duration::from_millis(5),
            Some(Duration::from_millis(40)),
        );
        assert_eq!(ch.poll_size(1, &policy).unwrap(), 1);
        let err = ch.poll_size(2, &policy).unwrap_err();
        assert!(matches!(err, ChannelError::Timeout { .. }));
    }

    #[test]
    fn remove_backing_file_is_best_effort() {
        let dir = TempDir::new().unwrap();
        let ch = channel(&dir, "COMMAND");
        assert!(remove_backing_file(ch.path()));
        assert!(!remove_backing_file(ch.path()), "second removal is a no-op");
    }
}
