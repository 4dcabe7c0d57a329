//! workstack — barrier-synchronized steps for process groups sharing a directory.
//!
//! # Usage
//!
//! ```text
//! workstack whoami [--config <file>] [--temp-dir <dir>] [--json]
//! workstack run [--config <file>] [--temp-dir <dir>] [--tag <tag>] -- <command> [args...]
//! workstack clean [--config <file>] [--temp-dir <dir>] [--job <id>] [--dry-run]
//! ```

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{clean::CleanArgs, run::RunArgs, whoami::WhoamiArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "workstack",
    version,
    about = "Coordinate array-job processes through a shared directory",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the rank, role and session directory this process would use.
    Whoami(WhoamiArgs),

    /// Run a command between a start and an end barrier of the whole group.
    Run(RunArgs),

    /// List or remove coordination files left behind by crashed sessions.
    Clean(CleanArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Whoami(args) => args.run().map(|()| ExitCode::SUCCESS),
        Commands::Run(args) => args.run(),
        Commands::Clean(args) => args.run().map(|()| ExitCode::SUCCESS),
    }
}

/// Protocol traces go to stderr so they never mix with a child's stdout.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
