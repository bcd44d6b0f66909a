//! Store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default application name, used for the default cache folder and file.
pub const DEFAULT_APP_NAME: &str = "stow";

/// Configuration for a [`Stow`](crate::Stow) handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StowConfig {
    /// Name of the per-application cache folder and default data file.
    pub app_name: String,

    /// Whether mutations schedule a debounced write.
    ///
    /// When disabled only explicit flushes (and the final flush on drop)
    /// reach the disk.
    pub autosave: bool,

    /// Debounce delay in milliseconds.
    ///
    /// After a change, the scheduler waits this long before saving.
    /// Additional changes reset the timer.
    pub debounce_ms: u64,

    /// Maximum delay before forcing a save.
    ///
    /// If changes keep coming, save after this many milliseconds since the
    /// first unsaved change. `None` lets the debounce be postponed forever.
    pub max_delay_ms: Option<u64>,

    /// Lock acquisition retry policy.
    pub lock: LockPolicy,

    /// Emit debug logging for load/save activity.
    pub debug: bool,
}

impl Default for StowConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            autosave: true,
            debounce_ms: 1000,
            max_delay_ms: None,
            lock: LockPolicy::default(),
            debug: false,
        }
    }
}

impl StowConfig {
    /// Create a config where mutations never schedule a write on their own.
    pub fn manual() -> Self {
        Self {
            autosave: false,
            ..Default::default()
        }
    }

    /// The quiescence window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Delay until the next write given the time since the first unsaved
    /// change.
    ///
    /// Normally the full debounce; capped so that the write happens no later
    /// than `max_delay_ms` after the first unsaved change.
    pub fn delay_until_save(&self, since_first_unsaved: Duration) -> Duration {
        let debounce = self.debounce();
        match self.max_delay_ms {
            Some(max) => {
                let remaining = Duration::from_millis(max).saturating_sub(since_first_unsaved);
                debounce.min(remaining)
            }
            None => debounce,
        }
    }
}

/// Retry policy for acquiring the advisory lock marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockPolicy {
    /// Retries after the first failed attempt before giving up.
    pub max_retries: u32,

    /// Lower bound of the randomized backoff (inclusive).
    pub backoff_min_ms: u64,

    /// Upper bound of the randomized backoff (exclusive).
    pub backoff_max_ms: u64,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            backoff_min_ms: 100,
            backoff_max_ms: 200,
        }
    }
}

impl LockPolicy {
    /// Pick a backoff inside `[backoff_min_ms, backoff_max_ms)` from a
    /// uniform sample in `[0, 1)`.
    pub fn backoff(&self, sample: f64) -> Duration {
        let span = self.backoff_max_ms.saturating_sub(self.backoff_min_ms);
        let offset = (span as f64 * sample.clamp(0.0, 1.0)) as u64;
        let offset = if span == 0 { 0 } else { offset.min(span - 1) };
        Duration::from_millis(self.backoff_min_ms + offset)
    }
}
