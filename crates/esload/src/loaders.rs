//! 📂 Loaders: the part of the pipeline that still has its feet on the local disk.
//!
//! 🧠 Knowledge graph:
//! - `index_config`: one JSON object per file, used as an index creation body. Fails hard.
//! - `ndjson`: one JSON object per line, becomes a `RecordBatch`. Abandons the whole file
//!   on the first bad line, and says so with a tagged error instead of an empty Vec.

pub mod index_config;
pub mod ndjson;

pub use index_config::load_config;
pub use ndjson::load_records;
