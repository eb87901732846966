//! 🚚 esload: newline-delimited JSON off the disk, into an Elasticsearch index.
//!
//! The pipeline, leaf first: `loaders` → `enrich` → `cluster` → `ingest`, with the
//! `driver` walking files through it one at a time and `progress` keeping score.

pub mod app_config;
pub mod cluster;
pub mod common;
pub mod driver;
pub mod enrich;
pub mod errors;
pub mod ingest;
pub mod loaders;
pub mod progress;

pub use driver::{FixedAnswer, Prompt, StdinPrompt, run};
pub use progress::RunReport;
