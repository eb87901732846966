//! 🚚 Bulk ingestor: one batch, one `/_bulk` request, a bounded amount of patience.
//!
//! 🎬 *[the cluster is down. the ingestor knocks. waits five seconds. knocks again.]*
//! *[after the sixth knock it leaves a note on the door and goes home.]*
//!
//! 🧠 Knowledge graph:
//! - **Gate**: the liveness check. Not connected → sleep a fixed delay → ping again.
//!   `max_retries` retries after the first ping, then `GaveUp`. No backoff. No jitter.
//! - **Submit**: the whole batch in one bulk call. Per-doc rejections land in the summary.
//! - **Failed**: the bulk call itself blew up (transport, non-2xx, garbage body). No retry.
//! - **Dated indices**: optional. The first record's date field picks `{index}.{YYYYMMDD}`,
//!   which gets created on the spot if it doesn't exist yet. A missing or garbled date
//!   fails the batch. Settings that won't load or a rejected create fail the whole run.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{info, warn};

use crate::app_config::{IndexConfig, IngestConfig};
use crate::cluster::{BulkSummary, ClusterClient, IndexDescriptor, IndexManager};
use crate::common::{Record, RecordBatch};
use crate::errors::ClusterError;

/// 🏁 How an ingest call ended. Tagged, so nobody has to guess what `false` meant.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// ✅ The bulk call was accepted. Check `summary` for per-document rejections.
    Indexed { index: String, summary: BulkSummary },
    /// 🔌 The cluster never passed the liveness check.
    GaveUp { attempts: u32 },
    /// 💀 The bulk call failed outright, or the batch had no usable date to pick an index.
    Failed { reason: String },
}

impl IngestOutcome {
    /// "The bulk call was accepted". Not "every document made it".
    pub fn is_success(&self) -> bool {
        matches!(self, IngestOutcome::Indexed { .. })
    }
}

/// 🚚 Sends batches. Owns a clone of the run's client and the retry knobs.
#[derive(Debug, Clone)]
pub struct BulkIngestor {
    client: ClusterClient,
    indices: IndexManager,
    max_retries: u32,
    retry_delay: Duration,
    index_config: IndexConfig,
}

impl BulkIngestor {
    pub fn new(client: ClusterClient, ingest_config: &IngestConfig, index_config: &IndexConfig) -> Self {
        Self {
            indices: IndexManager::new(client.clone()),
            client,
            max_retries: ingest_config.max_retries,
            retry_delay: Duration::from_secs(ingest_config.retry_delay_secs),
            index_config: index_config.clone(),
        }
    }

    /// 📦 Ingest `batch` into `index` (or its dated sibling, when that mode is on).
    ///
    /// 💀 `Err` is reserved for the fatal kind: a dated index that can't be created because
    /// its settings won't load or the cluster rejected it. Everything else is an outcome.
    pub async fn ingest(&self, batch: &RecordBatch, index: &str) -> Result<IngestOutcome> {
        if batch.is_empty() {
            info!("💤 '{}' has no records, nothing to send", batch.source().display());
            return Ok(IngestOutcome::Indexed {
                index: index.to_string(),
                summary: BulkSummary::default(),
            });
        }

        if let Err(attempts) = self.wait_for_cluster().await {
            warn!(
                "🔌 giving up on '{}' after {} connection attempts",
                batch.source().display(),
                attempts
            );
            return Ok(IngestOutcome::GaveUp { attempts });
        }

        let target = match self.target_for(batch, index) {
            Ok(target) => target,
            Err(err) => {
                warn!("💀 could not pick a target index for '{}': {:#}", batch.source().display(), err);
                return Ok(IngestOutcome::Failed {
                    reason: format!("{err:#}"),
                });
            }
        };

        if self.index_config.date_suffix_field.is_some() {
            match self.indices.exists(&target).await {
                Ok(true) => {}
                Ok(false) => self.create_dated(&target).await?,
                Err(err @ ClusterError::Index { .. }) => {
                    return Err(err)
                        .with_context(|| format!("💀 could not check dated index '{target}'"));
                }
                Err(err) => {
                    // -- the cluster wandered off between the liveness check and here
                    warn!("🔌 could not check '{}' for '{}': {}", target, batch.source().display(), err);
                    return Ok(IngestOutcome::Failed {
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!("📡 inserting {} records into '{}'", batch.len(), target);
        match self.client.bulk(&target, &batch.records).await {
            Ok(summary) => {
                info!(
                    "✅ data indexed into '{}': {} ok, {} rejected",
                    target,
                    summary.succeeded,
                    summary.failed()
                );
                for failure in &summary.failures {
                    warn!(
                        "⚠️ doc #{} of '{}' rejected ({}): {}",
                        failure.position,
                        batch.source().display(),
                        failure.status,
                        failure.reason
                    );
                }
                Ok(IngestOutcome::Indexed {
                    index: target,
                    summary,
                })
            }
            Err(err) => {
                warn!("💀 bulk request for '{}' failed: {}", batch.source().display(), err);
                Ok(IngestOutcome::Failed {
                    reason: err.to_string(),
                })
            }
        }
    }

    /// 🔁 Ping, sleep, ping. `Err(attempts)` once the retries are spent.
    async fn wait_for_cluster(&self) -> Result<(), u32> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if self.client.is_connected().await {
                return Ok(());
            }
            if attempts > self.max_retries {
                return Err(attempts);
            }
            warn!(
                "🔄 cluster not connected, retry {}/{} in {:?}",
                attempts, self.max_retries, self.retry_delay
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    fn target_for(&self, batch: &RecordBatch, index: &str) -> Result<String> {
        let Some(ref field) = self.index_config.date_suffix_field else {
            return Ok(index.to_string());
        };
        let first = batch
            .first()
            .ok_or_else(|| anyhow!("💀 no first record to take a date from"))?;
        dated_index_name(index, first, field, &self.index_config.date_format)
    }

    async fn create_dated(&self, target: &str) -> Result<()> {
        info!("🏗️ creating index '{}'", target);
        let descriptor = IndexDescriptor::load(
            target.to_string(),
            &self.index_config.settings_file,
            self.index_config.mapping_file.as_deref(),
        )
        .await
        .context("💀 could not load the index configuration")?;
        self.indices
            .create(&descriptor)
            .await
            .with_context(|| format!("💀 could not create dated index '{target}'"))
    }
}

/// 📅 `{base}.{YYYYMMDD}` from `record[field]`, parsed with `format`.
pub fn dated_index_name(base: &str, record: &Record, field: &str, format: &str) -> Result<String> {
    let raw = match record.get(field) {
        Some(Value::String(raw)) => raw,
        Some(other) => anyhow::bail!("💀 field '{field}' is not a string: {other}"),
        None => anyhow::bail!("💀 first record has no '{field}' field to date the index with"),
    };

    let date = NaiveDateTime::parse_from_str(raw, format)
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(raw, format))
        .with_context(|| format!("💀 '{raw}' does not match date format '{format}'"))?;

    Ok(format!("{}.{}", base, date.format("%Y%m%d")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    const TWITTER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

    #[test]
    fn the_one_where_a_tweet_picks_its_own_index() -> Result<()> {
        let first = record(json!({"created_at": "2021-03-04T05:06:07.000Z"}));
        let name = dated_index_name("base_index", &first, "created_at", TWITTER_FORMAT)?;
        assert_eq!(name, "base_index.20210304");
        Ok(())
    }

    #[test]
    fn the_one_where_the_date_field_never_showed_up() {
        let first = record(json!({"text": "no date here"}));
        let err = dated_index_name("base_index", &first, "created_at", TWITTER_FORMAT)
            .expect_err("💀 missing field must fail");
        assert!(err.to_string().contains("created_at"));
    }

    #[test]
    fn the_one_where_the_date_is_more_of_a_vibe() {
        let first = record(json!({"created_at": "last tuesday"}));
        assert!(dated_index_name("base_index", &first, "created_at", TWITTER_FORMAT).is_err());
    }

    #[test]
    fn the_one_where_a_plain_date_format_also_works() -> Result<()> {
        let first = record(json!({"day": "2020-12-31"}));
        assert_eq!(dated_index_name("logs", &first, "day", "%Y-%m-%d")?, "logs.20201231");
        Ok(())
    }

    #[test]
    fn the_one_where_only_indexed_counts_as_success() {
        let indexed = IngestOutcome::Indexed {
            index: "i".to_string(),
            summary: BulkSummary::default(),
        };
        assert!(indexed.is_success());
        assert!(!IngestOutcome::GaveUp { attempts: 6 }.is_success());
        assert!(!IngestOutcome::Failed { reason: "nope".to_string() }.is_success());
    }
}
