//! Rank resolution from an ordered list of sources.
//!
//! Sources are checked in order and the first one that is present wins. A
//! present but malformed value is an error rather than a fall-through, so a
//! typo in a job script does not silently turn a worker into a master.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::ProcessIdentity;

/// Environment variables consulted by default, in priority order.
pub const DEFAULT_RANK_VARS: [&str; 2] = ["SLURM_PROCID", "PARALLEL_RANK"];

/// Environment variable whose value isolates concurrent sessions.
pub const DEFAULT_JOB_ID_VAR: &str = "SLURM_JOBID";

/// Read-only view of process environment variables.
///
/// [`ProcessEnv`] reads the real environment; a `HashMap` lets tests run
/// several simulated processes side by side in one test binary.
pub trait Environment {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// One place a rank can come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankSource {
    /// Read the rank from an environment variable.
    Env(String),
    /// A fixed rank, mostly useful for tests and single-process runs.
    Fixed(u32),
}

impl RankSource {
    pub fn env(name: impl Into<String>) -> Self {
        RankSource::Env(name.into())
    }

    /// The default list: `SLURM_PROCID`, then `PARALLEL_RANK`.
    pub fn defaults() -> Vec<RankSource> {
        DEFAULT_RANK_VARS.iter().map(|v| RankSource::env(*v)).collect()
    }

    fn lookup(&self, env: &dyn Environment) -> Result<Option<u32>, CoreError> {
        match self {
            RankSource::Fixed(rank) => Ok(Some(*rank)),
            RankSource::Env(name) => match env.var(name) {
                None => Ok(None),
                Some(raw) => raw.trim().parse::<u32>().map(Some).map_err(|_| {
                    CoreError::InvalidRank {
                        source_name: name.clone(),
                        value: raw,
                    }
                }),
            },
        }
    }
}

impl fmt::Display for RankSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankSource::Env(name) => name.fmt(f),
            RankSource::Fixed(rank) => write!(f, "fixed rank {rank}"),
        }
    }
}

/// Resolve this process's identity from `sources`, first present wins.
///
/// Returns [`CoreError::RankUnresolved`] naming every source when none is
/// present.
pub fn resolve_identity(
    sources: &[RankSource],
    env: &dyn Environment,
) -> Result<ProcessIdentity, CoreError> {
    for source in sources {
        if let Some(rank) = source.lookup(env)? {
            return Ok(ProcessIdentity::from_rank(rank));
        }
    }
    Err(CoreError::RankUnresolved {
        sources: sources.iter().map(ToString::to_string).collect(),
    })
}

/// Read the job suffix used to isolate concurrent sessions, if configured
/// and present. Empty values are ignored.
pub fn resolve_job_suffix(job_id_var: Option<&str>, env: &dyn Environment) -> Option<String> {
    job_id_var
        .and_then(|name| env.var(name))
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn first_present_source_wins() {
        let env = env(&[("SLURM_PROCID", "4"), ("PARALLEL_RANK", "9")]);
        let identity = resolve_identity(&RankSource::defaults(), &env).unwrap();
        assert_eq!(identity.rank(), 4);
        assert_eq!(identity.role(), Role::Worker);
    }

    #[test]
    fn falls_through_to_later_source() {
        let env = env(&[("PARALLEL_RANK", "0")]);
        let identity = resolve_identity(&RankSource::defaults(), &env).unwrap();
        assert_eq!(identity.rank(), 0);
        assert!(identity.is_master());
    }

    #[test]
    fn unresolved_rank_names_all_sources() {
        let err = resolve_identity(&RankSource::defaults(), &env(&[])).unwrap_err();
        assert!(matches!(err, CoreError::RankUnresolved { .. }));
        let msg = err.to_string();
        assert!(msg.contains("SLURM_PROCID"), "got: {msg}");
        assert!(msg.contains("PARALLEL_RANK"), "got: {msg}");
    }

    #[test]
    fn malformed_rank_is_an_error() {
        let env = env(&[("SLURM_PROCID", "two")]);
        let err = resolve_identity(&RankSource::defaults(), &env).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRank { ref value, .. } if value == "two"));
    }

    #[test]
    fn fixed_source_needs_no_environment() {
        let sources = vec![RankSource::env("UNSET_RANK_VAR"), RankSource::Fixed(2)];
        let identity = resolve_identity(&sources, &env(&[])).unwrap();
        assert_eq!(identity.id().as_str(), "rank_2");
    }

    #[test]
    fn job_suffix_ignores_empty_values() {
        assert_eq!(
            resolve_job_suffix(Some("SLURM_JOBID"), &env(&[("SLURM_JOBID", "77")])),
            Some("77".to_string())
        );
        assert_eq!(
            resolve_job_suffix(Some("SLURM_JOBID"), &env(&[("SLURM_JOBID", " ")])),
            None
        );
        assert_eq!(resolve_job_suffix(None, &env(&[("SLURM_JOBID", "77")])), None);
    }
}
