//! Blocking polls with a doubling backoff.
//!
//! Polls never spin: every failed check sleeps, starting at
//! [`PollPolicy::interval`] and doubling up to [`PollPolicy::max_interval`].
//! Without a `max_wait` a poll blocks until its condition holds, which is
//! what the barrier relies on under the fail-stop-free assumption.

use std::path::Path;
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::error::ChannelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_interval: Duration,
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            max_interval: Duration::from_millis(250),
            max_wait: None,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_interval: Duration, max_wait: Option<Duration>) -> Self {
        Self {
            interval,
            max_interval: max_interval.max(interval),
            max_wait,
        }
    }

    /// Re-run `check` until it returns `true`, sleeping between attempts.
    ///
    /// `path` only labels the timeout error.
    pub fn wait_until<F>(&self, path: &Path, mut check: F) -> Result<(), ChannelError>
    where
        F: FnMut() -> Result<bool, ChannelError>,
    {
        let started = Instant::now();
        let mut delay = self.interval;
        loop {
            if check()? {
                return Ok(());
            }
            let mut nap = delay;
            if let Some(max_wait) = self.max_wait {
                let waited = started.elapsed();
                if waited >= max_wait {
                    return Err(ChannelError::Timeout {
                        path: path.to_path_buf(),
                        waited,
                    });
                }
                nap = nap.min(max_wait - waited);
            }
            sleep(nap);
            delay = (delay * 2).min(self.max_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast(max_wait: Option<Duration>) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(1), Duration::from_millis(4), max_wait)
    }

    #[test]
    fn returns_once_condition_holds() {
        let mut calls = 0;
        fast(None)
            .wait_until(Path::new("x"), || {
                calls += 1;
                Ok(calls == 3)
            })
            .expect("poll");
        assert_eq!(calls, 3);
    }

    #[test]
    fn times_out_when_max_wait_elapses() {
        let started = Instant::now();
        let err = fast(Some(Duration::from_millis(30)))
            .wait_until(Path::new("COMMAND"), || Ok(false))
            .unwrap_err();
        assert!(started.elapsed() >= Duration::from_millis(30));
        match err {
            ChannelError::Timeout { path, waited } => {
                assert_eq!(path, Path::new("COMMAND"));
                assert!(waited >= Duration::from_millis(30));
            }
            other => panic!("expected timeout, got {other}"),
        }
    }

    #[test]
    fn check_errors_propagate() {
        let err = fast(None)
            .wait_until(Path::new("x"), || {
                Err(ChannelError::InvalidValue {
                    value: "a\nb".to_string(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, ChannelError::InvalidValue { .. }));
    }

    #[test]
    fn max_interval_never_below_interval() {
        let policy = PollPolicy::new(Duration::from_millis(50), Duration::from_millis(1), None);
        assert_eq!(policy.max_interval, Duration::from_millis(50));
    }
}
