//! Coordinator configuration.
//!
//! Every field has a default, so an empty YAML document (or no file at all)
//! yields the stock behaviour: ranks from `SLURM_PROCID` / `PARALLEL_RANK`,
//! one-second settle delays and polls that never time out.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::identity::{RankSource, DEFAULT_JOB_ID_VAR};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordConfig {
    /// Ordered rank sources; the first one present wins.
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub rank_sources: Vec<RankSource>,
    /// Variable appended to the work directory name, `None` to disable.
    pub job_id_var: Option<String>,
    /// Pause after channel setup so peers see the directory and files.
    pub settle_delay_ms: u64,
    /// Pause between pushing onto `REGISTER` and the master's drain.
    pub registration_delay_ms: u64,
    /// First sleep between channel polls.
    pub poll_interval_ms: u64,
    /// Upper bound of the doubling poll backoff.
    pub max_poll_interval_ms: u64,
    /// Give up polling after this long. `None` waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wait_ms: Option<u64>,
}

impl Default for CoordConfig {
    fn default() -> Self {
        Self {
            rank_sources: RankSource::defaults(),
            job_id_var: Some(DEFAULT_JOB_ID_VAR.to_string()),
            settle_delay_ms: 1000,
            registration_delay_ms: 1000,
            poll_interval_ms: 10,
            max_poll_interval_ms: 250,
            max_wait_ms: None,
        }
    }
}

impl CoordConfig {
    /// Load a config from a YAML file.
    ///
    /// Returns `CoreError::ConfigNotFound` if absent, `CoreError::ConfigParse`
    /// (with path) if malformed.
    pub fn load_at(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        Self::from_yaml_str(&contents).map_err(|source| CoreError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        // serde_yaml rejects an empty document for a struct; treat it as defaults.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn registration_delay(&self) -> Duration {
        Duration::from_millis(self.registration_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms.max(self.poll_interval_ms).max(1))
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }
}
