//! Advisory file locking with bounded retry.
//!
//! The lock is a zero-byte marker created with create-new semantics next to
//! the data file. It only excludes code that goes through [`acquire`]; other
//! writers are not stopped. There is no stale-lock expiry: a marker left
//! behind by a crashed process blocks every later acquisition until it is
//! removed by hand.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::config::LockPolicy;
use crate::error::{PersistenceError, Result};

/// Source of waiting and jitter for lock retries.
///
/// Injectable so tests can run the retry loop without real sleeps.
pub trait Sleeper: Send + Sync {
    /// Block the current thread for `duration`.
    fn sleep(&self, duration: Duration);

    /// Uniform sample in `[0, 1)` used to spread retries.
    fn jitter(&self) -> f64;
}

/// Real sleeper: `thread::sleep` with OS-provided randomness.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }

    fn jitter(&self) -> f64 {
        let mut bytes = [0u8; 4];
        match getrandom::getrandom(&mut bytes) {
            Ok(()) => f64::from(u32::from_le_bytes(bytes)) / (f64::from(u32::MAX) + 1.0),
            Err(_) => 0.5,
        }
    }
}

/// A held lock marker.
///
/// Call [`LockGuard::release`] to observe removal failures; dropping the
/// guard removes the marker best-effort.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the marker.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        remove_marker(&self.path)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released {
            let _ = remove_marker(&self.path);
        }
    }
}

/// Acquire the lock marker at `path`, retrying under contention.
///
/// The first attempt runs immediately. Each failed attempt sleeps a random
/// backoff from `policy` and tries again, up to `policy.max_retries`
/// retries. After that the acquisition is abandoned with
/// [`PersistenceError::LockContended`].
pub fn acquire(path: &Path, policy: &LockPolicy, sleeper: &dyn Sleeper) -> Result<LockGuard> {
    let mut retries = 0;
    loop {
        match try_create(path) {
            Ok(()) => {
                return Ok(LockGuard {
                    path: path.to_path_buf(),
                    released: false,
                });
            }
            Err(_) => {
                if retries >= policy.max_retries {
                    return Err(PersistenceError::LockContended {
                        path: path.to_path_buf(),
                        attempts: retries + 1,
                    });
                }
                retries += 1;
                sleeper.sleep(policy.backoff(sleeper.jitter()));
            }
        }
    }
}

fn try_create(path: &Path) -> std::io::Result<()> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map(drop)
}

fn remove_marker(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| PersistenceError::Io {
        operation: "unlock",
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Records requested sleeps instead of sleeping.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSleeper {
        pub(crate) sleeps: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.sleeps.lock().push(duration);
        }

        fn jitter(&self) -> f64 {
            0.25
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSleeper;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_acquire_and_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json.lock");
        let sleeper = RecordingSleeper::default();

        let guard = acquire(&path, &LockPolicy::default(), &sleeper).unwrap();
        assert!(path.exists());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
        assert!(sleeper.sleeps.lock().is_empty());

        guard.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json.lock");

        {
            let _guard = acquire(&path, &LockPolicy::default(), &ThreadSleeper).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_contention_gives_up_after_max_retries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json.lock");
        fs::write(&path, b"").unwrap();
        let sleeper = RecordingSleeper::default();

        let result = acquire(&path, &LockPolicy::default(), &sleeper);

        assert!(matches!(
            result,
            Err(PersistenceError::LockContended { attempts: 11, .. })
        ));
        let sleeps = sleeper.sleeps.lock();
        assert_eq!(sleeps.len(), 10);
        assert!(sleeps.iter().all(|d| *d == Duration::from_millis(125)));
        // Stale marker left untouched
        assert!(path.exists());
    }

    #[test]
    fn test_release_of_missing_marker_reports_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json.lock");
        let guard = acquire(&path, &LockPolicy::default(), &ThreadSleeper).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(matches!(
            guard.release(),
            Err(PersistenceError::Io {
                operation: "unlock",
                ..
            })
        ));
    }

    #[test]
    fn test_jitter_in_unit_range() {
        for _ in 0..100 {
            let sample = ThreadSleeper.jitter();
            assert!((0.0..1.0).contains(&sample));
        }
    }
}
