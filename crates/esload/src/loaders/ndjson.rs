//! 🎬 *[one newline per doc. no commas. no brackets. just vibes and vertical whitespace.]*
//!
//! 📡 NDJSON record loader: turns a file into a `RecordBatch`, line by line.
//!
//! 🧠 Knowledge graph:
//! - **Framing**: one JSON object per line. Not an array. Blank lines are skipped.
//! - **Policy**: all or nothing. The first line that isn't a JSON object abandons the file
//!   and we return `LoadError::Parse` with the line number. Never a partial batch.
//! - **Empty file**: `Ok` with zero records. Distinguishable from a parse failure, on purpose.

use std::path::Path;

use tokio::{
    fs::File,
    io::{self, AsyncBufReadExt},
};
use tracing::{debug, trace};

use crate::common::{Record, RecordBatch};
use crate::errors::LoadError;

/// 📖 Read every record out of the NDJSON file at `path`, in file order.
pub async fn load_records(path: impl AsRef<Path>) -> Result<RecordBatch, LoadError> {
    let path = path.as_ref();
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file_handle = File::open(path).await.map_err(io_err)?;
    let mut buf_reader = io::BufReader::new(file_handle);

    let mut records = Vec::new();
    let mut line = String::new();
    let mut line_number = 0usize;

    loop {
        line.clear();
        let bytes_read = buf_reader.read_line(&mut line).await.map_err(io_err)?;
        if bytes_read == 0 {
            break;
        }
        line_number += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        records.push(parse_record(path, line_number, trimmed)?);
    }

    trace!(
        "📖 hauled {} records out of '{}' over {} lines",
        records.len(),
        path.display(),
        line_number
    );
    debug!("✅ loaded {} records from '{}'", records.len(), path.display());

    Ok(RecordBatch::new(path, records))
}

fn parse_record(path: &Path, line_number: usize, raw: &str) -> Result<Record, LoadError> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(record)) => Ok(record),
        Ok(_) => Err(LoadError::parse(
            path,
            line_number,
            "line is valid JSON but not an object",
        )),
        Err(e) => Err(LoadError::parse(path, line_number, e.to_string())),
    }
}
