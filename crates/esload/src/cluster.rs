//! 📡 Cluster: everything that speaks HTTP to Elasticsearch.
//!
//! 🧠 Knowledge graph:
//! - `client`: the one `ClusterClient` per run. Auth, transport retries, the liveness check.
//! - `indices`: exists / create / delete, each gated on the liveness check.
//! - `bulk`: renders a `RecordBatch` into `/_bulk` NDJSON and reads the per-item verdicts back.
//!
//! The Elasticsearch REST API is treated as a collaborator. We send it requests.
//! We do not pretend to understand its mapping semantics. Nobody does. 🦆

pub mod bulk;
pub mod client;
pub mod indices;

pub use bulk::{BulkFailure, BulkSummary};
pub use client::ClusterClient;
pub use indices::{IndexDescriptor, IndexManager};
