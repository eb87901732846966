//! 💀 errors.rs: the taxonomy of things that go wrong between a disk and a cluster.
//!
//! 🧠 Knowledge graph:
//! - `LoadError`: anything that happens before a byte touches the network (config files, NDJSON).
//! - `ClusterError`: anything the cluster (or the road to it) says back to us.
//! - `DriverError`: the run itself refusing to continue (bad prompt answer, nothing to read).
//!
//! The library returns these typed errors. The driver and CLI wrap them in `anyhow`
//! with context, because by then nobody is matching on variants anymore, they are just reading. 🦆

use std::path::PathBuf;

use thiserror::Error;

/// 📂 Failures while reading things off local disk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// 🔧 The index config file is missing, unreadable, or not a JSON object.
    #[error("config error in '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    /// 🧨 A line in an NDJSON file did not parse into a JSON object. The whole file is abandoned.
    #[error("parse error in '{path}' at line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// 💾 The NDJSON file could not be opened or read.
    #[error("io error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}

/// 📡 Failures talking to the cluster.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// 🔌 The liveness check failed at a point where an operation needed it to pass.
    #[error("connection error: cluster at '{host}' did not answer the liveness check")]
    Connection { host: String },

    /// 🗂️ The cluster rejected an index operation (create conflict, bad settings, and friends).
    #[error("index error on '{index}': status {status}: {body}")]
    Index {
        index: String,
        status: u16,
        body: String,
    },

    /// 🌩️ The request never got a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// 🧾 The cluster answered 2xx but the body wasn't what a cluster should say.
    #[error("malformed response from cluster: {0}")]
    MalformedResponse(String),

    /// 🏗️ The HTTP client could not be built, or the host URL is nonsense.
    #[error("client error: {0}")]
    Client(String),
}

impl ClusterError {
    pub fn index(index: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Index {
            index: index.into(),
            status,
            body: body.into(),
        }
    }
}

/// 🚦 The driver giving up on the whole run.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("invalid choice '{0}': expected 'y' or 'n'")]
    InvalidChoice(String),

    #[error("no input: set either a json file or a json directory")]
    NoInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_parse_errors_say_which_line_betrayed_us() {
        let err = LoadError::parse("data/b.json", 3, "expected value");
        let msg = err.to_string();
        assert!(msg.contains("data/b.json"));
        assert!(msg.contains("line 3"));
    }

    #[test]
    fn the_one_where_index_errors_keep_the_status_code() {
        let err = ClusterError::index("base_index", 400, "resource_already_exists_exception");
        match err {
            ClusterError::Index { status, ref index, .. } => {
                assert_eq!(status, 400);
                assert_eq!(index, "base_index");
            }
            other => panic!("💀 expected an Index error, got {other:?}"),
        }
    }
}
