use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::models::config::BoardConfig;
use crate::models::error::StreamError;
use crate::models::summary::StreamSummary;

/// Write a session summary as pretty JSON.
pub fn write_summary(summary: &StreamSummary, path: &Path) -> Result<(), StreamError> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| StreamError::StorageError(format!("failed to serialize summary: {}", e)))?;
    fs::write(path, json)
        .map_err(|e| StreamError::StorageError(format!("failed to write summary: {}", e)))?;
    Ok(())
}

/// Read a session summary written by `write_summary`.
pub fn read_summary(path: &Path) -> Result<StreamSummary, StreamError> {
    let json = fs::read_to_string(path)
        .map_err(|e| StreamError::StorageError(format!("failed to read summary: {}", e)))?;
    let summary: StreamSummary = serde_json::from_str(&json)
        .map_err(|e| StreamError::StorageError(format!("failed to parse summary: {}", e)))?;
    Ok(summary)
}

/// Load a board configuration from a JSON file, on top of `base`.
///
/// Fields missing from the file keep their value in `base`, nested objects
/// included. The result is not validated; callers validate after applying
/// command-line overrides.
pub fn load_config<C: BoardConfig>(base: C, path: &Path) -> Result<C, StreamError> {
    let json = fs::read_to_string(path)
        .map_err(|e| StreamError::StorageError(format!("failed to read {}: {}", path.display(), e)))?;
    let invalid = |e: serde_json::Error| StreamError::ConfigurationFailed(format!("{}: {}", path.display(), e));

    let overrides: Value = serde_json::from_str(&json).map_err(invalid)?;
    let mut merged = serde_json::to_value(&base).map_err(invalid)?;
    merge(&mut merged, overrides);
    serde_json::from_value(merged).map_err(invalid)
}

fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
