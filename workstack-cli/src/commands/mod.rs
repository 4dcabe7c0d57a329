pub mod clean;
pub mod run;
pub mod whoami;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use workstack_core::CoordConfig;

/// Options shared by every subcommand that touches a session.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// YAML file overriding rank sources, delays and poll timing.
    #[arg(long, env = "WORKSTACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Scratch root that holds the session directory [default: system temp dir].
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,
}

impl SessionArgs {
    pub fn load_config(&self) -> Result<CoordConfig> {
        match &self.config {
            Some(path) => CoordConfig::load_at(path)
                .with_context(|| format!("failed to load config {}", path.display())),
            None => Ok(CoordConfig::default()),
        }
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
