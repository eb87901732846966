//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every developer at 3am) 🦆
//!
//! 🏗️ Powered by Figment. Layers, lowest priority first:
//! 1. serde defaults (`http://localhost:9200`, `base_index`, 5 retries at 5s, ...)
//! 2. `ESLOAD_*` environment variables, `__` separates nesting (`ESLOAD_CLUSTER__HOST`)
//! 3. an optional TOML file
//!
//! CLI flags sit on top of all of that, applied by the binary after `load_config` returns.

use std::path::{Path, PathBuf};

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

/// 📦 One struct to rule them all. Every section defaults, so an empty config is a valid config.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub input: InputConfig,
}

/// 📡 Where the cluster lives and how patient the transport is with it.
///
/// Timeout, retry count and retry-on-timeout are baked into the client once, at construction.
#[derive(Debug, Deserialize, Clone)]
pub struct ClusterConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// 🔒 Wins over basic auth when both are set.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 🔄 Transport-level retries on connection failures. Not the ingest retry loop.
    #[serde(default = "default_transport_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_true")]
    pub retry_on_timeout: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            username: None,
            password: None,
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_transport_max_retries(),
            retry_on_timeout: true,
        }
    }
}

/// 🗂️ The target index and the files that describe how to create it.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_name")]
    pub name: String,
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,
    #[serde(default)]
    pub mapping_file: Option<PathBuf>,
    /// 📅 When set, each batch goes to `{name}.{YYYYMMDD}` using this field of its first record.
    #[serde(default)]
    pub date_suffix_field: Option<String>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
            settings_file: default_settings_file(),
            mapping_file: None,
            date_suffix_field: None,
            date_format: default_date_format(),
        }
    }
}

/// 🔁 The bulk ingest retry loop: fixed delay, fixed count, no backoff, no jitter.
#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_ingest_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_retries: default_ingest_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

/// 🏷️ What key gets stamped onto every record, and whose name goes on it.
#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_enrichment_key")]
    pub key: String,
    #[serde(default = "default_enrichment_author")]
    pub author: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key: default_enrichment_key(),
            author: default_enrichment_author(),
        }
    }
}

/// 📂 What to read. A directory, when set, beats a single file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct InputConfig {
    #[serde(default)]
    pub json_file: Option<PathBuf>,
    #[serde(default)]
    pub json_directory: Option<PathBuf>,
}

fn default_host() -> String {
    "http://localhost:9200".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_transport_max_retries() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_index_name() -> String {
    "base_index".to_string()
}

fn default_settings_file() -> PathBuf {
    PathBuf::from("index_settings.json")
}

fn default_date_format() -> String {
    "%Y-%m-%dT%H:%M:%S%.fZ".to_string()
}

fn default_ingest_max_retries() -> u32 {
    5
}

// -- ⏱️ 5 seconds. Long enough for a cluster to reboot its feelings, short enough to notice.
fn default_retry_delay_secs() -> u64 {
    5
}

fn default_enrichment_key() -> String {
    "caidac".to_string()
}

fn default_enrichment_author() -> String {
    "cbuntain".to_string()
}

/// 🚀 Load the config from env vars and, if given, a TOML file. TOML wins on conflicts.
///
/// 💀 Returns an error if the result doesn't deserialize. The context says which file.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("ESLOAD_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (ESLOAD_*).",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (ESLOAD_*). \
                 No file was provided, so this one's all on the environment."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_test_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("esload.toml");
        // 🧪 Real file on disk, because Figment wants TOML from disk, like it's method acting.
        fs::write(&path, contents)
            .expect("💀 Failed to write test config. The filesystem said 'new phone who dis'.");
        path
    }

    #[test]
    fn the_one_where_an_empty_file_gets_all_the_defaults() {
        let dir = tempfile::tempdir().expect("💀 no tempdir, no test");
        let path = write_test_config(&dir, "");

        let app_config: AppConfig = Figment::new()
            .merge(Toml::file(&path))
            .extract()
            .expect("💀 An empty config should be a valid config.");

        assert_eq!(app_config.cluster.host, "http://localhost:9200");
        assert_eq!(app_config.cluster.request_timeout_secs, 30);
        assert_eq!(app_config.cluster.max_retries, 10);
        assert!(app_config.cluster.retry_on_timeout);
        assert_eq!(app_config.index.name, "base_index");
        assert_eq!(app_config.index.settings_file, PathBuf::from("index_settings.json"));
        assert_eq!(app_config.ingest.max_retries, 5);
        assert_eq!(app_config.ingest.retry_delay_secs, 5);
        assert!(app_config.enrichment.enabled);
        assert_eq!(app_config.enrichment.key, "caidac");
        assert!(app_config.input.json_file.is_none());
    }

    #[test]
    fn the_one_where_the_toml_file_gets_its_way() {
        let dir = tempfile::tempdir().expect("💀 no tempdir, no test");
        let path = write_test_config(
            &dir,
            r#"
            [cluster]
            host = "http://search.internal:9200"
            api_key = "c2VjcmV0"

            [index]
            name = "tweets"
            date_suffix_field = "created_at"

            [ingest]
            max_retries = 2
            retry_delay_secs = 10

            [enrichment]
            enabled = false

            [input]
            json_directory = "data"
            "#,
        );

        let app_config = load_config(Some(path.as_path()))
            .expect("💀 A well-formed TOML file should load.");

        assert_eq!(app_config.cluster.host, "http://search.internal:9200");
        assert_eq!(app_config.cluster.api_key.as_deref(), Some("c2VjcmV0"));
        assert_eq!(app_config.index.name, "tweets");
        assert_eq!(app_config.index.date_suffix_field.as_deref(), Some("created_at"));
        assert_eq!(app_config.ingest.max_retries, 2);
        assert_eq!(app_config.ingest.retry_delay_secs, 10);
        assert!(!app_config.enrichment.enabled);
        assert_eq!(app_config.input.json_directory, Some(PathBuf::from("data")));
    }

    #[test]
    fn the_one_where_a_typo_in_the_types_is_not_forgiven() {
        let dir = tempfile::tempdir().expect("💀 no tempdir, no test");
        let path = write_test_config(
            &dir,
            r#"
            [ingest]
            max_retries = "five"
            "#,
        );

        let err = load_config(Some(path.as_path()))
            .expect_err("💀 a string where a number goes should not parse");
        assert!(err.to_string().contains("esload.toml"));
    }

    #[test]
    fn the_one_where_the_retry_delay_is_counted_in_seconds() {
        let dir = tempfile::tempdir().expect("💀 no tempdir, no test");
        let path = write_test_config(
            &dir,
            r#"
            [ingest]
            retry_delay_secs = 1
            "#,
        );

        let app_config = load_config(Some(path.as_path()))
            .expect("💀 the documented delay key should load.");

        // -- 1 second, not the 5 second default. the key landed.
        assert_eq!(app_config.ingest.retry_delay_secs, 1);
        assert_eq!(app_config.ingest.max_retries, 5);
    }
}
