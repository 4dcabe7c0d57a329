//! `workstack run` — run one command in lock-step with the rest of the group.
//!
//! Every process of the group calls `workstack run` with the same `--tag`.
//! Nobody starts the command before everyone has initialized, and nobody
//! exits before everyone has finished. The child sees its rank and the
//! session directory as `WORKSTACK_RANK` and `WORKSTACK_WORK_DIR`.

use std::process::{Command, ExitCode};

use anyhow::{bail, Context, Result};
use clap::Args;

use workstack_sync::Coordinator;

use super::SessionArgs;

/// Arguments for `workstack run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Barrier tag prefix; the group meets at `<tag>-start` and `<tag>-end`.
    #[arg(long, default_value = "run")]
    pub tag: String,

    /// Command to run, after `--`.
    #[arg(required = true, last = true)]
    pub command: Vec<String>,
}

impl RunArgs {
    pub fn run(self) -> Result<ExitCode> {
        let (program, args) = self
            .command
            .split_first()
            .context("no command given after `--`")?;
        let config = self.session.load_config()?;
        let temp_dir = self.session.temp_dir();

        let mut coord = Coordinator::new(config);
        coord
            .initialize(&temp_dir)
            .context("failed to initialize coordinator")?;
        let rank = coord.rank().unwrap_or_default();
        let work_dir = coord
            .work_directory()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();

        wait_for_group(&mut coord, &format!("{}-start", self.tag))?;
        log_step(&coord, &format!("start {}", self.command.join(" ")));

        let status = Command::new(program)
            .args(args)
            .env("WORKSTACK_RANK", rank.to_string())
            .env("WORKSTACK_WORK_DIR", &work_dir)
            .status();

        // Peers block on the end barrier, so reach it whatever happened above.
        let code = match &status {
            Ok(status) => status.code().unwrap_or(1),
            Err(_) => SPAWN_FAILED,
        };
        log_step(&coord, &format!("exit {code}"));
        wait_for_group(&mut coord, &format!("{}-end", self.tag))?;
        coord.teardown();

        match status {
            Ok(status) if !status.success() => tracing::warn!(rank, code, "command failed"),
            Ok(_) => {}
            Err(err) => eprintln!("Error: failed to start `{program}`: {err}"),
        }
        Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
    }
}

/// Exit code for a command that could not be started, as in POSIX shells.
const SPAWN_FAILED: i32 = 127;

/// Log lines are diagnostics; failing to write one must not skip a barrier.
fn log_step(coord: &Coordinator, message: &str) {
    if let Err(err) = coord.log(message) {
        tracing::warn!(error = %err, "could not write to the session log");
    }
}

fn wait_for_group(coord: &mut Coordinator, tag: &str) -> Result<()> {
    if !coord
        .barrier(tag)
        .with_context(|| format!("barrier `{tag}` failed"))?
    {
        bail!("barrier `{tag}` skipped: coordinator not initialized");
    }
    Ok(())
}
