//! Store saving operations.

use std::fs::{self, File};
use std::io::Write;

use crate::config::LockPolicy;
use crate::error::{PersistenceError, Result};
use crate::event::{PersistEvent, Reporter};
use crate::io::lock::{self, Sleeper};
use crate::paths::PersistenceTarget;
use crate::store::Store;

/// Serialize a store to the on-disk format: a two-space indented JSON
/// object.
pub fn serialize_store(store: &Store) -> Result<String> {
    serde_json::to_string_pretty(store.as_map())
        .map_err(|e| PersistenceError::Serialization { source: e })
}

/// Save a store to its target under the advisory lock.
///
/// Uses atomic write (temp file + rename) so the data file is never left
/// half-written.
pub fn save_store(
    store: &Store,
    target: &PersistenceTarget,
    policy: &LockPolicy,
    sleeper: &dyn Sleeper,
) -> Result<()> {
    let reporter = Reporter::new(false, None);
    save_locked(target, policy, sleeper, &reporter, || {
        serialize_store(store).map(|json| (json, ()))
    })
}

/// Run one locked write cycle.
///
/// `snapshot` is called inside the critical section and returns the JSON
/// text to write plus a value handed back on success. The lock marker is
/// released whatever the outcome; a failed release is reported, not
/// returned.
pub(crate) fn save_locked<T, F>(
    target: &PersistenceTarget,
    policy: &LockPolicy,
    sleeper: &dyn Sleeper,
    reporter: &Reporter,
    snapshot: F,
) -> Result<T>
where
    F: FnOnce() -> Result<(String, T)>,
{
    // The lock marker lives next to the data file
    if let Some(parent) = target.file.parent() {
        fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let guard = lock::acquire(&target.lock, policy, sleeper)?;

    let result = snapshot().and_then(|(json, value)| {
        write_atomic(target, json.as_bytes())?;
        Ok(value)
    });

    if let Err(error) = guard.release() {
        reporter.emit(PersistEvent::UnlockFailed(&error));
    }

    result
}

/// Write `bytes` to the temp path, sync, then rename over the data file.
fn write_atomic(target: &PersistenceTarget, bytes: &[u8]) -> Result<()> {
    let result = write_temp(target, bytes).and_then(|()| {
        fs::rename(&target.temp, &target.file).map_err(|e| PersistenceError::AtomicWriteFailed {
            temp_path: target.temp.clone(),
            target_path: target.file.clone(),
            source: e,
        })
    });

    if result.is_err() {
        let _ = fs::remove_file(&target.temp);
    }
    result
}

fn write_temp(target: &PersistenceTarget, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(&target.temp).map_err(|e| PersistenceError::Io {
        operation: "create",
        path: target.temp.clone(),
        source: e,
    })?;

    file.write_all(bytes).map_err(|e| PersistenceError::Io {
        operation: "write",
        path: target.temp.clone(),
        source: e,
    })?;

    file.sync_all().map_err(|e| PersistenceError::Io {
        operation: "sync",
        path: target.temp.clone(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::load::read_store;
    use crate::io::lock::ThreadSleeper;
    use crate::io::lock::testing::RecordingSleeper;
    use proptest::prelude::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_store() -> Store {
        let mut store = Store::new();
        store.insert("foo", json!({"bar": "baz"}));
        store.insert("list", json!([1, 2, 3]));
        store
    }

    #[test]
    fn test_save_store() {
        let dir = tempdir().unwrap();
        let target = PersistenceTarget::from_file(&dir.path().join("data.json")).unwrap();

        save_store(&sample_store(), &target, &LockPolicy::default(), &ThreadSleeper).unwrap();

        assert!(target.file.exists());
        assert!(!target.temp.exists());
        assert!(!target.lock.exists());
        assert_eq!(read_store(&target.file).unwrap(), sample_store());
    }

    #[test]
    fn test_on_disk_format_is_indented() {
        let mut store = Store::new();
        store.insert("foo", json!({"bar": "baz"}));

        insta::assert_snapshot!(serialize_store(&store).unwrap(), @r#"
        {
          "foo": {
            "bar": "baz"
          }
        }
        "#);
    }

    #[test]
    fn test_save_creates_missing_parent() {
        let dir = tempdir().unwrap();
        let target =
            PersistenceTarget::from_file(&dir.path().join("nested").join("data.json")).unwrap();

        save_store(&sample_store(), &target, &LockPolicy::default(), &ThreadSleeper).unwrap();

        assert!(target.file.exists());
    }

    #[test]
    fn test_contended_save_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let target = PersistenceTarget::from_file(&dir.path().join("data.json")).unwrap();
        fs::write(&target.file, r#"{"old": 1}"#).unwrap();
        fs::write(&target.lock, b"").unwrap();
        let sleeper = RecordingSleeper::default();

        let result = save_store(&sample_store(), &target, &LockPolicy::default(), &sleeper);

        assert!(matches!(result, Err(PersistenceError::LockContended { .. })));
        assert_eq!(fs::read_to_string(&target.file).unwrap(), r#"{"old": 1}"#);
        assert_eq!(sleeper.sleeps.lock().len(), 10);
    }

    #[test]
    fn test_failed_snapshot_still_releases_lock() {
        let dir = tempdir().unwrap();
        let target = PersistenceTarget::from_file(&dir.path().join("data.json")).unwrap();
        let reporter = Reporter::new(false, None);

        let result: Result<()> = save_locked(
            &target,
            &LockPolicy::default(),
            &ThreadSleeper,
            &reporter,
            || {
                Err(PersistenceError::Serialization {
                    source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
                })
            },
        );

        assert!(matches!(result, Err(PersistenceError::Serialization { .. })));
        assert!(!target.lock.exists());
        assert!(!target.file.exists());
    }

    #[test]
    fn test_failed_rename_keeps_previous_file() {
        let dir = tempdir().unwrap();
        // A directory at the data path makes the rename fail
        let target = PersistenceTarget::from_file(&dir.path().join("data.json")).unwrap();
        fs::create_dir(&target.file).unwrap();
        fs::write(target.file.join("keep"), b"x").unwrap();

        let result = save_store(&sample_store(), &target, &LockPolicy::default(), &ThreadSleeper);

        assert!(matches!(
            result,
            Err(PersistenceError::AtomicWriteFailed { .. })
        ));
        assert!(target.file.join("keep").exists());
        assert!(!target.temp.exists());
        assert!(!target.lock.exists());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_saved_store_reads_back_equal(
            entries in prop::collection::btree_map(
                "[a-z][a-z0-9 _-]{0,10}[a-z0-9]",
                (any::<bool>(), any::<i32>(), "[ -~]{0,16}"),
                0..12,
            ),
        ) {
            let dir = tempdir().unwrap();
            let target = PersistenceTarget::from_file(&dir.path().join("prop.json")).unwrap();
            let mut store = Store::new();
            for (key, (flag, number, text)) in &entries {
                store.insert(key, json!({"flag": flag, "number": number, "text": text}));
            }

            save_store(&store, &target, &LockPolicy::default(), &ThreadSleeper).unwrap();

            prop_assert_eq!(read_store(&target.file).unwrap(), store);
        }
    }
}
