//! `workstack clean` — remove coordination files left by crashed sessions.

use anyhow::{Context, Result};
use clap::Args;

use workstack_core::{resolve_job_suffix, ProcessEnv, WorkSession};
use workstack_sync::{purge_session, stale_session_files};

use super::SessionArgs;

/// Arguments for `workstack clean`.
#[derive(Args, Debug)]
pub struct CleanArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Job id of the session [default: value of the configured job variable].
    #[arg(long)]
    pub job: Option<String>,

    /// List the files without removing them.
    #[arg(long)]
    pub dry_run: bool,
}

impl CleanArgs {
    pub fn run(self) -> Result<()> {
        let config = self.session.load_config()?;
        let job = self
            .job
            .clone()
            .or_else(|| resolve_job_suffix(config.job_id_var.as_deref(), &ProcessEnv));
        let dir = WorkSession::new(self.session.temp_dir(), job).directory();

        let files = if self.dry_run {
            stale_session_files(&dir)
        } else {
            purge_session(&dir)
        }
        .with_context(|| format!("failed to scan {}", dir.display()))?;

        if files.is_empty() {
            println!("No coordination files in {}", dir.display());
            return Ok(());
        }
        let prefix = if self.dry_run { "[dry-run] would remove" } else { "removed" };
        for file in &files {
            println!("{prefix}: {}", file.display());
        }
        Ok(())
    }
}
