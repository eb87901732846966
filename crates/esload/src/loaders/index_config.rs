//! 🔧 Index config loader: reads `index_settings.json` (and friends) off disk.
//!
//! No defaults. No "we'll make something up". If the file isn't there, index creation
//! doesn't happen, and the caller hears about it loudly.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::LoadError;

/// 📜 Read a JSON object from `path`.
///
/// 💀 Missing file, unreadable file, invalid JSON, or valid JSON that isn't an object:
/// all of them are `LoadError::Config`.
pub async fn load_config(path: impl AsRef<Path>) -> Result<Map<String, Value>, LoadError> {
    let path = path.as_ref();
    debug!("🔧 reading index config from '{}'", path.display());

    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LoadError::config(path, e.to_string()))?;

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(body)) => Ok(body),
        Ok(other) => Err(LoadError::config(
            path,
            format!("expected a JSON object, found {}", json_kind(&other)),
        )),
        Err(e) => Err(LoadError::config(path, e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn the_one_where_settings_load_like_a_dream() {
        let dir = tempfile::tempdir().expect("💀 no tempdir, no test");
        let path = dir.path().join("index_settings.json");
        fs::write(&path, r#"{"number_of_shards": 1, "number_of_replicas": 0}"#)
            .expect("💀 failed to write fixture");

        let body = load_config(&path).await.expect("💀 valid settings should load");
        assert_eq!(body.get("number_of_shards"), Some(&Value::from(1)));
    }

    #[tokio::test]
    async fn the_one_where_the_file_simply_is_not_there() {
        let dir = tempfile::tempdir().expect("💀 no tempdir, no test");
        let err = load_config(dir.path().join("nope.json"))
            .await
            .expect_err("💀 a missing file must be fatal");
        assert!(matches!(err, LoadError::Config { .. }));
    }

    #[tokio::test]
    async fn the_one_where_the_json_is_more_of_a_suggestion() {
        let dir = tempfile::tempdir().expect("💀 no tempdir, no test");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").expect("💀 failed to write fixture");

        let err = load_config(&path).await.expect_err("💀 malformed JSON must be fatal");
        assert!(matches!(err, LoadError::Config { .. }));
    }

    #[tokio::test]
    async fn the_one_where_an_array_tries_to_pass_as_settings() {
        let dir = tempfile::tempdir().expect("💀 no tempdir, no test");
        let path = dir.path().join("array.json");
        fs::write(&path, "[1, 2, 3]").expect("💀 failed to write fixture");

        let err = load_config(&path).await.expect_err("💀 arrays are not settings");
        assert!(err.to_string().contains("an array"));
    }
}
