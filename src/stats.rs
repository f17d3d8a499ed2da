//! Write statistics reported when a sink finishes.
//!
//! [`SinkStats`] lists every file the sink produced together with its frozen
//! column list and row/byte counts. It serializes to JSON and can be saved next
//! to the output for later inspection.
//!
//! ```no_run
//! use keyed_csv_sink::KeyedCsvSink;
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut sink = KeyedCsvSink::builder("events").target_dir("out").build()?;
//! sink.write_value(&json!({"clicks": [{"id": 1}]}))?;
//! let stats = sink.finish()?;
//! stats.save_to_file("out/events.stats.json")?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Statistics for one output file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileStats {
    /// Entity key the file was opened for.
    pub key: String,
    /// Full path of the file.
    pub path: PathBuf,
    /// Column order frozen from the key's first row.
    pub columns: Vec<String>,
    /// Rows written (header excluded).
    pub rows: u64,
    /// Encoded bytes written, before compression.
    pub bytes: u64,
}

/// Statistics for a finished sink.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    /// Number of chunks accepted in full. A chunk rejected part-way is not counted.
    pub chunks: u64,
    /// One entry per output file, in the order the files were opened.
    pub files: Vec<FileStats>,
}

impl SinkStats {
    /// Total rows across all files.
    #[must_use]
    pub fn total_rows(&self) -> u64 {
        self.files.iter().map(|f| f.rows).sum()
    }

    /// Total encoded bytes across all files.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes).sum()
    }

    /// Look up the file written for `key`.
    #[must_use]
    pub fn file(&self, key: &str) -> Option<&FileStats> {
        self.files.iter().find(|f| f.key == key)
    }

    /// Save the statistics as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("serialize sink stats")?;
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}
