//! 🏷️ Metadata enricher: stamps every record with where it came from.
//!
//! The dataset tag is the name of the directory the file lives in. `data/covid/a.json`
//! becomes `{"dataset": "covid", "author": ..., "metadata": null}` under the configured key.
//!
//! ⚠️ The value is built fresh for every record. No shared template gets mutated between
//! calls, so record #1 never finds out what record #2's dataset was.

use std::path::Path;

use serde_json::{Value, json};

use crate::app_config::EnrichmentConfig;
use crate::common::{Record, RecordBatch};

/// 🏷️ Knows which key to stamp and who to credit.
#[derive(Debug, Clone)]
pub struct Enricher {
    key: String,
    author: String,
}

impl Enricher {
    pub fn new(key: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            author: author.into(),
        }
    }

    /// 🔧 `None` when enrichment is switched off in config.
    pub fn from_config(config: &EnrichmentConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.key.clone(), config.author.clone()))
    }

    /// 🎯 Insert the enrichment object into `record`, overwriting whatever was under the key.
    pub fn enrich(&self, path: &Path, mut record: Record) -> Record {
        record.insert(self.key.clone(), self.value_for(path));
        record
    }

    /// 📦 Enrich every record in the batch. All of them or none of them, never a sample.
    pub fn enrich_batch(&self, batch: &mut RecordBatch) {
        let value = self.value_for(&batch.source);
        for record in &mut batch.records {
            record.insert(self.key.clone(), value.clone());
        }
    }

    fn value_for(&self, path: &Path) -> Value {
        json!({
            "dataset": dataset_tag(path),
            "author": self.author,
            "metadata": Value::Null,
        })
    }
}

/// 📁 Immediate parent directory name, or an empty string when there isn't one.
pub fn dataset_tag(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn the_one_where_the_directory_becomes_the_dataset() {
        let enricher = Enricher::new("caidac", "cbuntain");
        let enriched = enricher.enrich(Path::new("/data/covid/a.json"), record(json!({"id": 7})));

        assert_eq!(enriched["id"], json!(7));
        assert_eq!(
            enriched["caidac"],
            json!({"dataset": "covid", "author": "cbuntain", "metadata": null})
        );
    }

    #[test]
    fn the_one_where_enriching_twice_changes_nothing() {
        let enricher = Enricher::new("caidac", "cbuntain");
        let path = Path::new("tweets/2020/x.json");
        let once = enricher.enrich(path, record(json!({"text": "hi"})));
        let twice = enricher.enrich(path, once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn the_one_where_a_stale_value_gets_overwritten() {
        let enricher = Enricher::new("caidac", "cbuntain");
        let stale = record(json!({"caidac": "left over from a previous life"}));
        let enriched = enricher.enrich(Path::new("fresh/doc.json"), stale);
        assert_eq!(enriched["caidac"]["dataset"], json!("fresh"));
    }

    #[test]
    fn the_one_where_a_bare_filename_has_no_dataset() {
        assert_eq!(dataset_tag(Path::new("a.json")), "");
        assert_eq!(dataset_tag(Path::new("nested/deeper/a.json")), "deeper");
    }

    #[test]
    fn the_one_where_the_whole_batch_gets_stamped_uniformly() {
        let enricher = Enricher::new("tag", "someone");
        let mut batch = RecordBatch::new(
            "dump/part.json",
            vec![record(json!({"n": 1})), record(json!({"n": 2}))],
        );
        enricher.enrich_batch(&mut batch);

        assert!(batch.records.iter().all(|r| r["tag"]["dataset"] == json!("dump")));
        assert!(batch.records.iter().all(|r| r["tag"]["author"] == json!("someone")));
    }

    #[test]
    fn the_one_where_config_can_switch_it_off() {
        let mut config = EnrichmentConfig::default();
        assert!(Enricher::from_config(&config).is_some());
        config.enabled = false;
        assert!(Enricher::from_config(&config).is_none());
    }
}
