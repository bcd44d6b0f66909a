//! Store loading and corrupt-file recovery.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{PersistenceError, Result};
use crate::event::{PersistEvent, Reporter};
use crate::paths::PersistenceTarget;
use crate::store::Store;

/// Read a data file into a store.
pub fn read_store(path: &Path) -> Result<Store> {
    let content = fs::read_to_string(path).map_err(|e| PersistenceError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_store(&content, path)
}

/// Parse data file content; the top level must be a JSON object.
fn parse_store(content: &str, path: &Path) -> Result<Store> {
    let document: Value =
        serde_json::from_str(content).map_err(|e| PersistenceError::Deserialization {
            path: path.to_path_buf(),
            source: e,
        })?;

    match document {
        Value::Object(entries) => Ok(Store::from_map(entries)),
        other => Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: format!("expected a JSON object at the top level, found {}", kind(&other)),
        }),
    }
}

/// Load the store for `target`, never failing.
///
/// When the file cannot be read or parsed, an existing file is renamed to
/// the `.corrupt` sibling and an empty store is returned. A missing file
/// simply yields an empty store.
pub(crate) fn load_or_recover(target: &PersistenceTarget, reporter: &Reporter) -> Store {
    match read_store(&target.file) {
        Ok(store) => {
            reporter.emit(PersistEvent::Loaded {
                path: &target.file,
                items: store.len(),
            });
            store
        }
        Err(error) => {
            let existed = target.file.exists();
            reporter.emit(PersistEvent::LoadFailed(&error));
            if existed {
                match quarantine(target) {
                    Ok(()) => reporter.emit(PersistEvent::Quarantined {
                        backup: &target.backup,
                    }),
                    Err(error) => reporter.emit(PersistEvent::LoadFailed(&error)),
                }
            }
            Store::new()
        }
    }
}

/// Move the data file to its backup path.
fn quarantine(target: &PersistenceTarget) -> Result<()> {
    fs::rename(&target.file, &target.backup).map_err(|e| PersistenceError::Io {
        operation: "quarantine",
        path: target.file.clone(),
        source: e,
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
