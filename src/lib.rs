//! # keyed-csv-sink
//!
//! A **streaming sink** that fans keyed record batches out into one CSV file
//! per key, writing rows as they arrive instead of buffering the dataset.
//!
//! ## Key Features
//!
//! - **Lazy per-key files** - a file is opened the first time its key has a row
//! - **Frozen columns** - the first row of a key fixes that file's column order
//! - **Safe file names** - keys like `orders/eu/2024` become `sales---orders---eu_2024.csv`
//! - **Envelopes** - values may be plain row sequences or `{data, metadata}` objects
//! - **Bounded memory** - each file buffers at most a configurable number of bytes
//! - **Orderly teardown** - [`finish`](KeyedCsvSink::finish) flushes every file,
//!   [`abort`](KeyedCsvSink::abort) destroys them without flushing
//! - **Optional compression** - gzip, zstd, bzip2 and xz behind feature flags
//!
//! ## Quick Start
//!
//! ```no_run
//! use keyed_csv_sink::KeyedCsvSink;
//! use serde_json::json;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let mut sink = KeyedCsvSink::builder("sales").target_dir("exports").build()?;
//!
//! sink.write_value(&json!({
//!     "orders/eu": [{"id": 1, "total": 9.5}, {"id": 2, "total": 3.0}],
//!     "orders/us": {"data": [{"id": 3, "total": 1.25}], "metadata": {"page": 1}},
//!     "refunds":   []
//! }))?;
//!
//! let stats = sink.finish()?;
//! // exports/sales---orders---eu.csv and exports/sales---orders---us.csv
//! assert_eq!(stats.files.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Chunks
//!
//! A [`Chunk`] is an ordered JSON object from entity key to rows. Rows are JSON
//! objects; values are rendered as CSV fields (strings verbatim, numbers as
//! written, `null` as an empty field, nested values as compact JSON). Use
//! [`ChunkBuilder`] to assemble chunks from typed records.
//!
//! ### Channels
//!
//! Each key gets exactly one channel for the lifetime of the sink: a CSV
//! encoder bound to the key's frozen column list, feeding the key's file. An
//! empty row sequence never opens a channel.
//!
//! ### Errors
//!
//! [`SinkError::kind`] tells callers what an error means for the sink. Shape
//! errors fail only the current call; filesystem errors abort the whole sink.
//!
//! ## Feature Flags
//!
//! - `compression-gzip`, `compression-zstd`, `compression-bzip2`, `compression-xz` -
//!   enable the corresponding [`Compression`] codec
//! - `parallel-io` - end channels on the rayon pool during [`finish`](KeyedCsvSink::finish)
//!
//! ## Module Overview
//!
//! - [`sink`] - the sink, its builder and lifecycle states
//! - [`chunk`] - chunk types and envelope normalisation
//! - [`naming`] - key escaping and file naming
//! - [`options`] - configuration and encoder options
//! - [`encoder`] - row-to-record encoding
//! - [`io`] - filesystem seam, file writer and compression
//! - [`stats`] - per-file statistics
//! - [`testing`] - fixtures, assertions and fault injection for tests

mod channel;
pub mod chunk;
pub mod encoder;
pub mod error;
pub mod io;
pub mod naming;
pub mod options;
pub mod sink;
pub mod stats;
pub mod testing;

// General re-exports
pub use chunk::{Chunk, ChunkBuilder, Row};
pub use error::{ErrorKind, Result, SinkError};
pub use io::compression::Compression;
pub use io::fs::{EntryKind, FileSystem, LocalFs};
pub use options::{BooleanFormat, EncoderOptions, QuoteStyle, RecordDelimiter, SinkOptions};
pub use sink::{DirectoryState, KeyedCsvSink, SinkBuilder, SinkState};
pub use stats::{FileStats, SinkStats};
