//! 📦 `/_bulk`: Elasticsearch's loading dock.
//!
//! 🧠 Knowledge graph:
//! - **Wire format**: two NDJSON lines per doc, `{"index":{"_index":..}}` then the source.
//!   Trailing `\n` on the last line, because ES said so and we don't argue with ES.
//! - **Metadata keys**: a record carrying `_id` or `_routing` has them lifted into the action
//!   line and removed from the source, the same way the official client helpers do it.
//! - **Verdicts**: the response lists one item per doc. We count them up into a `BulkSummary`.
//!   A bad document is a line in the summary, never a reason to throw away the batch.

use reqwest::Method;
use serde_json::{Map, Value, json};
use tracing::{debug, trace};

use crate::cluster::ClusterClient;
use crate::common::Record;
use crate::errors::ClusterError;

/// 🔑 Keys that belong in the action line, not in the document.
const ACTION_METADATA_KEYS: [(&str, &str); 2] = [("_id", "_id"), ("_routing", "routing")];

/// 📊 What happened to a batch, document by document, rolled up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<BulkFailure>,
}

/// 💀 One document the cluster refused. `position` is its index within the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkFailure {
    pub position: usize,
    pub status: u16,
    pub reason: String,
}

impl BulkSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// 🧾 Read the `_bulk` response body. `attempted` is how many docs we sent.
    pub(crate) fn from_response(attempted: usize, response: &Value) -> Self {
        let Some(items) = response.get("items").and_then(Value::as_array) else {
            // -- 🤷 no item list: trust the top-level errors flag, it's all we have
            let errors = response.get("errors").and_then(Value::as_bool).unwrap_or(false);
            return Self {
                attempted,
                succeeded: if errors { 0 } else { attempted },
                failures: Vec::new(),
            };
        };

        let mut failures = Vec::new();
        for (position, item) in items.iter().enumerate() {
            // -- each item is {"<action>": {...}}, we don't care which action
            let Some(result) = item.as_object().and_then(|o| o.values().next()) else {
                failures.push(BulkFailure {
                    position,
                    status: 0,
                    reason: "malformed bulk item".to_string(),
                });
                continue;
            };
            // -- 0 for "no status" and for anything that doesn't fit an HTTP status
            let status = result
                .get("status")
                .and_then(Value::as_u64)
                .and_then(|status| u16::try_from(status).ok())
                .unwrap_or(0);
            if let Some(error) = result.get("error") {
                failures.push(BulkFailure {
                    position,
                    status,
                    reason: error_reason(error),
                });
            } else if !(200..300).contains(&status) {
                failures.push(BulkFailure {
                    position,
                    status,
                    reason: format!("status {status}"),
                });
            }
        }

        Self {
            attempted,
            succeeded: items.len().saturating_sub(failures.len()),
            failures,
        }
    }
}

fn error_reason(error: &Value) -> String {
    match error {
        Value::String(reason) => reason.clone(),
        Value::Object(fields) => {
            let kind = fields.get("type").and_then(Value::as_str).unwrap_or("error");
            match fields.get("reason").and_then(Value::as_str) {
                Some(reason) => format!("{kind}: {reason}"),
                None => kind.to_string(),
            }
        }
        other => other.to_string(),
    }
}

/// 🎼 Render `records` into a `/_bulk` body targeting `index`.
pub(crate) fn render_bulk_body(index: &str, records: &[Record]) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    for record in records {
        let mut the_action_metadata = Map::new();
        the_action_metadata.insert("_index".to_string(), Value::String(index.to_string()));

        let needs_surgery = ACTION_METADATA_KEYS
            .iter()
            .any(|(key, _)| record.contains_key(*key));

        let source = if needs_surgery {
            let mut stripped = record.clone();
            for (key, action_key) in ACTION_METADATA_KEYS {
                if let Some(value) = stripped.remove(key) {
                    the_action_metadata.insert(action_key.to_string(), value);
                }
            }
            serde_json::to_string(&stripped)?
        } else {
            serde_json::to_string(record)?
        };

        body.push_str(&serde_json::to_string(&json!({ "index": the_action_metadata }))?);
        body.push('\n');
        body.push_str(&source);
        body.push('\n');
    }
    Ok(body)
}

impl ClusterClient {
    /// 📡 POST the whole batch to `/_bulk` in one request and summarize the verdicts.
    ///
    /// 🔄 No retries beyond the transport's own. The ingest loop decides about the rest.
    pub async fn bulk(&self, index: &str, records: &[Record]) -> Result<BulkSummary, ClusterError> {
        let payload = render_bulk_body(index, records)
            .map_err(|e| ClusterError::Client(format!("could not render bulk body: {e}")))?;
        debug!(
            "📡 sending {} docs ({} bytes) to '{}' via /_bulk",
            records.len(),
            payload.len(),
            index
        );

        let request = self
            .request(Method::POST, "/_bulk")
            .header("Content-Type", "application/x-ndjson")
            .body(payload);
        let response = self.send(request).await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClusterError::index(index, status.as_u16(), text));
        }

        let parsed: Value = serde_json::from_str(&text)
            .map_err(|e| ClusterError::MalformedResponse(e.to_string()))?;
        trace!("🚀 bulk request landed, documents have left the building");

        Ok(BulkSummary::from_response(records.len(), &parsed))
    }
}
