//! `workstack whoami` — identity and session directory, without side effects.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use workstack_core::{
    resolve_identity, resolve_job_suffix, ProcessEnv, ProcessIdentity, Role, WorkSession,
};

use super::SessionArgs;

/// Arguments for `workstack whoami`.
#[derive(Args, Debug)]
pub struct WhoamiArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct WhoamiJson<'a> {
    #[serde(flatten)]
    identity: &'a ProcessIdentity,
    job: Option<&'a str>,
    work_directory: String,
}

impl WhoamiArgs {
    pub fn run(self) -> Result<()> {
        let config = self.session.load_config()?;
        let identity = resolve_identity(&config.rank_sources, &ProcessEnv)
            .context("cannot coordinate without a rank")?;
        let session = WorkSession::new(
            self.session.temp_dir(),
            resolve_job_suffix(config.job_id_var.as_deref(), &ProcessEnv),
        );

        if self.json {
            let payload = WhoamiJson {
                identity: &identity,
                job: session.job_suffix(),
                work_directory: session.directory().display().to_string(),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to render JSON")?
            );
            return Ok(());
        }

        let role = match identity.role() {
            Role::Master => identity.role().to_string().green().bold(),
            Role::Worker => identity.role().to_string().cyan(),
        };
        println!("{} {}", identity.id().to_string().bold(), role);
        println!("  rank:            {}", identity.rank());
        println!("  job:             {}", session.job_suffix().unwrap_or("-"));
        println!("  work directory:  {}", session.directory().display());
        Ok(())
    }
}
