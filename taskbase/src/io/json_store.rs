//! Shared load/save plumbing for the JSON stores.
//!
//! Loads validate the document against an embedded JSON Schema before
//! deserializing; any mismatch is a `CorruptStore`. Saves replace the whole file
//! through a temp file + rename.

use std::fs;
use std::path::Path;

use jsonschema::validator_for;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, TaskbaseError};

/// Read `path`, validate it against `schema`, and deserialize it.
pub fn load_validated<T: DeserializeOwned>(path: &Path, schema: &str) -> Result<T> {
    debug!(path = %path.display(), "loading store");
    let contents = fs::read_to_string(path).map_err(|err| TaskbaseError::io(path, err))?;
    let value: Value = serde_json::from_str(&contents)
        .map_err(|err| corrupt(path, format!("parse json: {err}")))?;
    validate_schema(path, schema, &value)?;
    serde_json::from_value(value).map_err(|err| corrupt(path, format!("deserialize: {err}")))
}

/// Pretty-print `value` and atomically replace `path` with it.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    debug!(path = %path.display(), "writing store");
    let mut buf = serde_json::to_string_pretty(value)
        .map_err(|err| TaskbaseError::io(path, std::io::Error::other(err)))?;
    buf.push('\n');
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| TaskbaseError::io(parent, err))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, buf).map_err(|err| TaskbaseError::io(&tmp_path, err))?;
    fs::rename(&tmp_path, path).map_err(|err| TaskbaseError::io(path, err))
}

pub(crate) fn corrupt(path: &Path, reason: impl Into<String>) -> TaskbaseError {
    TaskbaseError::CorruptStore {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn validate_schema(path: &Path, schema: &str, value: &Value) -> Result<()> {
    let schema_value: Value = serde_json::from_str(schema)
        .map_err(|err| corrupt(path, format!("embedded schema is not json: {err}")))?;
    let compiled = validator_for(&schema_value)
        .map_err(|err| corrupt(path, format!("invalid schema: {err}")))?;
    let messages: Vec<String> = compiled
        .iter_errors(value)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(corrupt(
            path,
            format!("schema validation failed: {}", messages.join("; ")),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const SCHEMA: &str = r#"{
        "type": "object",
        "additionalProperties": { "type": "integer" }
    }"#;

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("store.json");
        let value: BTreeMap<String, i64> = [("a".to_string(), 1)].into_iter().collect();
        write_json_atomic(&path, &value).expect("write");
        let loaded: BTreeMap<String, i64> = load_validated(&path, SCHEMA).expect("load");
        assert_eq!(loaded, value);
        assert!(!path.with_extension("json.tmp").exists());
        let raw = fs::read_to_string(&path).expect("read");
        assert_eq!(raw, "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn shape_mismatch_is_corrupt_store() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("store.json");
        fs::write(&path, r#"{"a": "one"}"#).expect("write");
        let err = load_validated::<BTreeMap<String, i64>>(&path, SCHEMA).expect_err("corrupt");
        assert!(matches!(err, TaskbaseError::CorruptStore { .. }), "{err}");
    }

    #[test]
    fn unparsable_json_is_corrupt_store() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("store.json");
        fs::write(&path, "{not json").expect("write");
        let err = load_validated::<BTreeMap<String, i64>>(&path, SCHEMA).expect_err("corrupt");
        assert!(matches!(err, TaskbaseError::CorruptStore { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_validated::<BTreeMap<String, i64>>(&temp.path().join("nope.json"), SCHEMA)
            .expect_err("missing");
        assert!(matches!(err, TaskbaseError::Io { .. }));
    }
}
