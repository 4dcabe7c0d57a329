//! Cleanup ledger for channel files.
//!
//! Two lists:
//! - `continuous` — the files of the most recently completed barrier round.
//!   They are swept when the next round is scheduled, giving stragglers one
//!   round of grace before their files disappear.
//! - `final` — files of channels created through the coordinator (the four
//!   well-known ones plus any extra named channel), swept at teardown.
//!
//! The last round's files outlive teardown; the next master initialization
//! in the same directory removes them with [`purge_barrier_files`].
//!
//! Sweeps are best-effort and always clear the list they swept.

use std::path::{Path, PathBuf};

use workstack_channel::remove_backing_file;

use crate::coordinator::{BARRIER_PREFIX, COMMAND, LOG, REGISTER, WORKERS};

#[derive(Debug, Default)]
pub struct CleanupLedger {
    continuous: Vec<PathBuf>,
    final_files: Vec<PathBuf>,
}

impl CleanupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sweep the previous round, then remember `files` as the current one.
    pub fn schedule_round<I>(&mut self, files: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.sweep_continuous();
        self.continuous.extend(files);
    }

    /// Queue the files of a round that did not complete, without sweeping
    /// the previous round. The next [`schedule_round`] removes both.
    ///
    /// [`schedule_round`]: CleanupLedger::schedule_round
    pub fn defer_round<I>(&mut self, files: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.continuous.extend(files);
    }

    /// Remember a session-scoped file for teardown.
    pub fn track_final(&mut self, path: PathBuf) {
        if !self.final_files.contains(&path) {
            self.final_files.push(path);
        }
    }

    pub fn continuous(&self) -> &[PathBuf] {
        &self.continuous
    }

    pub fn final_files(&self) -> &[PathBuf] {
        &self.final_files
    }

    /// Returns the number of files actually removed.
    pub fn sweep_continuous(&mut self) -> usize {
        sweep(&mut self.continuous)
    }

    /// Returns the number of files actually removed.
    pub fn sweep_final(&mut self) -> usize {
        sweep(&mut self.final_files)
    }
}

fn sweep(files: &mut Vec<PathBuf>) -> usize {
    let removed = files.iter().filter(|p| remove_backing_file(p)).count();
    tracing::debug!(listed = files.len(), removed, "swept channel files");
    files.clear();
    removed
}

// ---------------------------------------------------------------------------
// Stale sessions
// ---------------------------------------------------------------------------

/// Coordination files left in a session directory, sorted by name.
///
/// Only names this library creates are listed; anything else in the
/// directory is left alone. A missing directory yields an empty list.
pub fn stale_session_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|e| is_coordination_file(&e.file_name().to_string_lossy()))
        .map(|e| e.path())
        .collect();
    files.sort();
    Ok(files)
}

/// Remove every coordination file from a session directory.
///
/// Leaves the directory itself in place. Returns the removed paths.
pub fn purge_session(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let files = stale_session_files(dir)?;
    Ok(files.into_iter().filter(|p| remove_backing_file(p)).collect())
}

/// Remove only the per-round barrier files from a session directory.
pub fn purge_barrier_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let files = stale_session_files(dir)?;
    Ok(files
        .into_iter()
        .filter(|p| {
            p.file_name()
                .is_some_and(|name| is_barrier_file(&name.to_string_lossy()))
        })
        .filter(|p| remove_backing_file(p))
        .collect())
}

fn is_coordination_file(name: &str) -> bool {
    matches!(name, COMMAND | WORKERS | REGISTER)
        || name.starts_with(&format!("{LOG}_"))
        || is_barrier_file(name)
}

fn is_barrier_file(name: &str) -> bool {
    name.starts_with(&format!("{BARRIER_PREFIX}_cmd_"))
        || name.starts_with(&format!("{BARRIER_PREFIX}_ack_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn schedule_round_keeps_one_round_of_lag() {
        let dir = TempDir::new().unwrap();
        let mut ledger = CleanupLedger::new();

        let round0 = vec![touch(&dir, "BARRIER_cmd_s_0"), touch(&dir, "BARRIER_ack_s_0")];
        ledger.schedule_round(round0.clone());
        assert!(round0.iter().all(|p| p.exists()));

        let round1 = vec![touch(&dir, "BARRIER_cmd_s_1"), touch(&dir, "BARRIER_ack_s_1")];
        ledger.schedule_round(round1.clone());
        assert!(round0.iter().all(|p| !p.exists()), "round 0 swept on round 1");
        assert!(round1.iter().all(|p| p.exists()));
        assert_eq!(ledger.continuous(), round1.as_slice());
    }

    #[test]
    fn deferred_round_is_swept_with_the_previous_one() {
        let dir = TempDir::new().unwrap();
        let mut ledger = CleanupLedger::new();
        let round0 = touch(&dir, "BARRIER_cmd_s_0");
        ledger.schedule_round([round0.clone()]);
        let failed = touch(&dir, "BARRIER_cmd_s_1");
        ledger.defer_round([failed.clone()]);
        assert!(round0.exists(), "deferring does not sweep");

        ledger.schedule_round([touch(&dir, "BARRIER_cmd_s_2")]);
        assert!(!round0.exists() && !failed.exists());
    }

    #[test]
    fn sweeps_ignore_missing_files_and_clear_the_list() {
        let dir = TempDir::new().unwrap();
        let mut ledger = CleanupLedger::new();
        ledger.track_final(touch(&dir, "COMMAND"));
        ledger.track_final(dir.path().join("never-created"));
        ledger.track_final(dir.path().join("COMMAND"));
        assert_eq!(ledger.final_files().len(), 2, "duplicates are tracked once");

        assert_eq!(ledger.sweep_final(), 1);
        assert!(ledger.final_files().is_empty());
        assert_eq!(ledger.sweep_final(), 0);
    }

    #[test]
    fn stale_files_only_lists_coordination_names() {
        let dir = TempDir::new().unwrap();
        for name in [
            "COMMAND",
            "WORKERS",
            "REGISTER",
            "LOG_rank_3",
            "BARRIER_cmd_step_0",
            "BARRIER_ack_step_0",
            "results.csv",
            "COMMANDS",
        ] {
            touch(&dir, name);
        }
        let names: Vec<String> = stale_session_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "BARRIER_ack_step_0",
                "BARRIER_cmd_step_0",
                "COMMAND",
                "LOG_rank_3",
                "REGISTER",
                "WORKERS",
            ]
        );
    }

    #[test]
    fn purge_leaves_directory_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "COMMAND");
        touch(&dir, "BARRIER_cmd_a_9");
        let keep = touch(&dir, "notes.txt");
        let removed = purge_session(dir.path()).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(dir.path().is_dir());
        assert!(keep.exists());
    }

    #[test]
    fn purge_barrier_files_keeps_session_channels() {
        let dir = TempDir::new().unwrap();
        let command = touch(&dir, "COMMAND");
        let log = touch(&dir, "LOG_rank_0");
        touch(&dir, "BARRIER_cmd_end_4");
        touch(&dir, "BARRIER_ack_end_4");
        let removed = purge_barrier_files(dir.path()).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(command.exists() && log.exists());
    }

    #[test]
    fn missing_session_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(stale_session_files(&dir.path().join("gone")).unwrap().is_empty());
    }
}
