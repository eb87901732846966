//! 📦 Common data structures: the records and batches that ride from disk to cluster.
//!
//! 🎬 A file is read. Each line becomes a `Record`. The records huddle together in a
//! `RecordBatch`, which remembers the file it came from (the enricher needs that, and
//! so does anyone reading the logs at 3am).
//!
//! No schema is enforced here. Whether a record makes sense is the index mapping's problem. 🦆

use std::path::{Path, PathBuf};

/// 🎯 One document. Keys are strings, values are whatever JSON felt like that day.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// 📦 The ordered records of exactly one source file.
///
/// Order is file read order, end to end. Nobody sorts, nobody shuffles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    pub source: PathBuf,
    pub records: Vec<Record>,
}

impl RecordBatch {
    pub fn new(source: impl Into<PathBuf>, records: Vec<Record>) -> Self {
        Self {
            source: source.into(),
            records,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 🥇 The first record, which gets to decide the dated index name when that mode is on.
    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }
}
