//! The keyed CSV sink.
//!
//! [`KeyedCsvSink`] receives chunks (key → rows) one at a time and routes the
//! rows of every key to that key's own CSV file inside a target directory.
//!
//! # Lifecycle
//!
//! 1. **Construction** validates the collection name and options
//!    ([`KeyedCsvSink::builder`], [`KeyedCsvSink::new`]). Nothing touches the
//!    filesystem yet.
//! 2. **First chunk** checks the target directory once, creating it (one
//!    level) if it is missing. A path that exists but is not a directory is a
//!    fatal error.
//! 3. **Every chunk** opens a channel for each key on its first non-empty row
//!    sequence, freezing the column list from that first row, and appends the
//!    rows in order.
//! 4. **Finish** ends every channel, flushing encoder buffers, codec trailers
//!    and file handles, and returns [`SinkStats`].
//! 5. **Abort** destroys every channel in reverse opening order without
//!    flushing buffered rows.
//!
//! Dropping a sink that still has open channels destroys them as an abort
//! would.
//!
//! # Example
//!
//! ```no_run
//! use keyed_csv_sink::{ChunkBuilder, KeyedCsvSink};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut sink = KeyedCsvSink::builder("sales")
//!     .target_dir("exports")
//!     .header(true)
//!     .build()?;
//!
//! sink.write_chunk(
//!     &ChunkBuilder::new()
//!         .rows("orders/eu", vec![json!({"id": 1, "total": 9.5})])
//!         .rows("orders/us", vec![])
//!         .build(),
//! )?;
//!
//! let stats = sink.finish()?;
//! assert_eq!(stats.files.len(), 1); // exports/sales---orders---eu.csv
//! # Ok(())
//! # }
//! ```

use crate::channel::KeyedChannel;
use crate::chunk::{Chunk, json_type_name, rows_for};
use crate::error::{Result, SinkError};
use crate::io::compression::Compression;
use crate::io::fs::{EntryKind, FileSystem, LocalFs};
use crate::naming::file_name_for_key;
use crate::options::{EncoderOptions, QuoteStyle, SinkOptions};
use crate::stats::{FileStats, SinkStats};
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether the sink still accepts input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkState {
    /// Accepting chunks.
    Open,
    /// [`KeyedCsvSink::finish`] was called.
    Finished,
    /// The sink was torn down after an error.
    Aborted,
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Finished => "finished",
            Self::Aborted => "aborted",
        })
    }
}

/// Whether the target directory has been verified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectoryState {
    /// Not checked yet.
    Unknown,
    /// Verified to exist, or just created.
    Ready,
}

/// Streaming sink writing one CSV file per entity key.
pub struct KeyedCsvSink {
    collection: String,
    target_dir: PathBuf,
    options: SinkOptions,
    fs: Arc<dyn FileSystem>,
    state: SinkState,
    directory: DirectoryState,
    // Registration order is kept so teardown can run in reverse.
    channels: Vec<KeyedChannel>,
    index: HashMap<String, usize>,
    chunks: u64,
}

impl fmt::Debug for KeyedCsvSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedCsvSink")
            .field("collection", &self.collection)
            .field("target_dir", &self.target_dir)
            .field("state", &self.state)
            .field("directory", &self.directory)
            .field("open_channels", &self.channels.len())
            .finish_non_exhaustive()
    }
}

impl KeyedCsvSink {
    /// Start configuring a sink for `collection`.
    #[must_use]
    pub fn builder(collection: impl Into<String>) -> SinkBuilder {
        SinkBuilder::new(collection)
    }

    /// Create a sink writing to `target_dir` (the current directory if `None`).
    ///
    /// # Errors
    /// Returns [`SinkError::Config`] for an empty or path-like collection name,
    /// invalid options, or an unreadable current directory.
    pub fn new(
        collection: impl Into<String>,
        target_dir: Option<PathBuf>,
        options: SinkOptions,
    ) -> Result<Self> {
        let mut builder = SinkBuilder::new(collection).options(options);
        builder.target_dir = target_dir;
        builder.build()
    }

    /// Collection name used as the file prefix.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Directory the files are written to.
    #[must_use]
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Options in effect.
    #[must_use]
    pub const fn options(&self) -> &SinkOptions {
        &self.options
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SinkState {
        self.state
    }

    /// Whether the target directory has been verified.
    #[must_use]
    pub fn is_directory_ready(&self) -> bool {
        self.directory == DirectoryState::Ready
    }

    /// Keys with an open channel, in the order they were opened.
    pub fn open_keys(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(KeyedChannel::key)
    }

    /// Path of the open channel for `key`, if any.
    #[must_use]
    pub fn channel_path(&self, key: &str) -> Option<&Path> {
        self.index.get(key).map(|&i| self.channels[i].path())
    }

    /// Path the file for `key` is (or would be) written to.
    #[must_use]
    pub fn path_for_key(&self, key: &str) -> PathBuf {
        self.target_dir.join(file_name_for_key(
            &self.collection,
            key,
            &self.options.entity_name_separator,
            &self.options.safe_entity_name_separator,
            self.options.compression.extension(),
        ))
    }

    /// Accept one chunk.
    ///
    /// Keys are processed in chunk order. Rows already written for earlier keys
    /// stay written if a later key fails.
    ///
    /// # Errors
    /// - Input-shape errors ([`SinkError::InvalidEnvelope`], [`SinkError::InvalidData`],
    ///   [`SinkError::InvalidRow`]) fail this call only.
    /// - Filesystem errors abort the sink before being returned.
    /// - [`SinkError::Closed`] once the sink is finished or aborted.
    pub fn write_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        self.ensure_open()?;
        if self.directory == DirectoryState::Unknown {
            if let Err(e) = self.prepare_directory() {
                return Err(self.abort(e));
            }
        }

        for (key, value) in chunk {
            let rows = rows_for(key, value)?;
            if rows.is_empty() {
                continue;
            }
            if let Err(e) = self.write_rows(key, rows) {
                return Err(if e.is_fatal() { self.abort(e) } else { e });
            }
        }
        self.chunks += 1;
        Ok(())
    }

    /// Accept a chunk that is still an untyped JSON value.
    ///
    /// # Errors
    /// [`SinkError::InvalidChunk`] if `value` is not an object, otherwise as
    /// [`KeyedCsvSink::write_chunk`].
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        self.ensure_open()?;
        match value {
            Value::Object(chunk) => self.write_chunk(chunk),
            other => Err(SinkError::InvalidChunk {
                found: json_type_name(other),
            }),
        }
    }

    /// End every channel and report what was written.
    ///
    /// Returns once every file has been flushed to the OS (no `fsync`). All
    /// channels are ended even if one of them fails; the first failure is
    /// returned and the sink is left aborted.
    ///
    /// Channels are ended in reverse opening order, or concurrently when the
    /// `parallel-io` feature is enabled. [`SinkStats::files`] is always in
    /// opening order.
    ///
    /// # Errors
    /// [`SinkError::Flush`] or [`SinkError::Write`] from a failing channel,
    /// [`SinkError::Closed`] if the sink was already finished or aborted.
    pub fn finish(&mut self) -> Result<SinkStats> {
        self.ensure_open()?;
        self.index.clear();
        let channels = std::mem::take(&mut self.channels);

        let mut files = Vec::with_capacity(channels.len());
        let mut first_error = None;
        for result in end_all(channels) {
            match result {
                Ok(file) => files.push(file),
                Err(e) => {
                    warn!(collection = %self.collection, error = %e, "failed to close output channel");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            self.state = SinkState::Aborted;
            return Err(e);
        }
        self.state = SinkState::Finished;

        let stats = SinkStats {
            chunks: self.chunks,
            files,
        };
        info!(
            collection = %self.collection,
            files = stats.files.len(),
            rows = stats.total_rows(),
            bytes = stats.total_bytes(),
            "sink finished"
        );
        Ok(stats)
    }

    /// Destroy every open channel and hand `cause` back for propagation.
    ///
    /// Buffered rows that have not reached their file are discarded. Calling
    /// this on a finished or aborted sink only returns `cause`.
    pub fn abort(&mut self, cause: SinkError) -> SinkError {
        if self.state == SinkState::Open {
            warn!(
                collection = %self.collection,
                error = %cause,
                open_channels = self.channels.len(),
                "aborting sink"
            );
            self.state = SinkState::Aborted;
        }
        self.destroy_channels();
        cause
    }

    /// Write every chunk in order, then finish.
    ///
    /// # Errors
    /// The first error encountered; the sink is aborted before it is returned.
    pub fn write_all<I>(&mut self, chunks: I) -> Result<SinkStats>
    where
        I: IntoIterator<Item = Chunk>,
    {
        self.try_write_all(chunks.into_iter().map(Ok::<_, Infallible>))
    }

    /// Like [`KeyedCsvSink::write_all`] for producers that can fail.
    ///
    /// A producer error aborts the sink and is returned as [`SinkError::Upstream`].
    ///
    /// # Errors
    /// The first producer or sink error.
    pub fn try_write_all<I, E>(&mut self, chunks: I) -> Result<SinkStats>
    where
        I: IntoIterator<Item = std::result::Result<Chunk, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        for item in chunks {
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(e) => return Err(self.abort(SinkError::upstream(e))),
            };
            if let Err(e) = self.write_chunk(&chunk) {
                return Err(self.abort(e));
            }
        }
        self.finish()
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            SinkState::Open => Ok(()),
            state => Err(SinkError::Closed { state }),
        }
    }

    fn prepare_directory(&mut self) -> Result<()> {
        let dir = &self.target_dir;
        match self.fs.metadata(dir) {
            Ok(EntryKind::Directory) => {}
            Ok(_) => return Err(SinkError::NotADirectory { path: dir.clone() }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.fs
                    .create_dir(dir)
                    .map_err(|source| SinkError::DirectoryCreate {
                        path: dir.clone(),
                        source,
                    })?;
                debug!(path = %dir.display(), "created target directory");
            }
            Err(source) => {
                return Err(SinkError::DirectoryCheck {
                    path: dir.clone(),
                    source,
                });
            }
        }
        self.directory = DirectoryState::Ready;
        Ok(())
    }

    fn write_rows(&mut self, key: &str, rows: &[Value]) -> Result<()> {
        let idx = match self.index.get(key).copied() {
            Some(idx) => idx,
            None => self.open_channel(key, &rows[0])?,
        };
        let channel = &mut self.channels[idx];
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_object().ok_or_else(|| SinkError::InvalidRow {
                key: key.to_string(),
                index,
            })?;
            channel.write_row(row)?;
        }
        Ok(())
    }

    fn open_channel(&mut self, key: &str, first_row: &Value) -> Result<usize> {
        let first_row = first_row.as_object().ok_or_else(|| SinkError::InvalidRow {
            key: key.to_string(),
            index: 0,
        })?;
        let columns = first_row.keys().cloned().collect();
        let path = self.path_for_key(key);
        let channel = KeyedChannel::open(self.fs.as_ref(), key, path, columns, &self.options)?;

        let idx = self.channels.len();
        self.channels.push(channel);
        self.index.insert(key.to_string(), idx);
        Ok(idx)
    }

    fn destroy_channels(&mut self) {
        self.index.clear();
        for channel in std::mem::take(&mut self.channels).into_iter().rev() {
            channel.destroy();
        }
    }
}

impl Drop for KeyedCsvSink {
    fn drop(&mut self) {
        if !self.channels.is_empty() {
            warn!(
                collection = %self.collection,
                open_channels = self.channels.len(),
                "sink dropped without finish; destroying open channels"
            );
            self.destroy_channels();
        }
    }
}

/// End channels, returning results in opening order.
#[cfg(feature = "parallel-io")]
fn end_all(channels: Vec<KeyedChannel>) -> Vec<Result<FileStats>> {
    use rayon::prelude::*;
    channels.into_par_iter().map(KeyedChannel::end).collect()
}

/// End channels in reverse opening order, returning results in opening order.
#[cfg(not(feature = "parallel-io"))]
fn end_all(channels: Vec<KeyedChannel>) -> Vec<Result<FileStats>> {
    let mut results: Vec<_> = channels.into_iter().rev().map(KeyedChannel::end).collect();
    results.reverse();
    results
}

/// Fluent configuration for [`KeyedCsvSink`].
///
/// ```
/// use keyed_csv_sink::KeyedCsvSink;
///
/// let sink = KeyedCsvSink::builder("users")
///     .target_dir("/tmp/out")
///     .delimiter(';')
///     .header(true)
///     .build()
///     .unwrap();
/// assert_eq!(sink.path_for_key("eu/west").file_name().unwrap(), "users---eu---west.csv");
/// ```
pub struct SinkBuilder {
    collection: String,
    target_dir: Option<PathBuf>,
    options: SinkOptions,
    fs: Option<Arc<dyn FileSystem>>,
}

impl SinkBuilder {
    /// Start with default options for `collection`.
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            target_dir: None,
            options: SinkOptions::default(),
            fs: None,
        }
    }

    /// Directory to write into. Defaults to the current directory.
    #[must_use]
    pub fn target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target_dir = Some(dir.into());
        self
    }

    /// Replace all options at once.
    #[must_use]
    pub fn options(mut self, options: SinkOptions) -> Self {
        self.options = options;
        self
    }

    /// Logical separator inside entity keys.
    #[must_use]
    pub fn entity_name_separator(mut self, sep: impl Into<String>) -> Self {
        self.options.entity_name_separator = sep.into();
        self
    }

    /// Path-safe replacement separator.
    #[must_use]
    pub fn safe_entity_name_separator(mut self, sep: impl Into<String>) -> Self {
        self.options.safe_entity_name_separator = sep.into();
        self
    }

    /// Replace the encoder options.
    #[must_use]
    pub fn encoder(mut self, encoder: EncoderOptions) -> Self {
        self.options.encoder = encoder;
        self
    }

    /// Field delimiter.
    #[must_use]
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.options.encoder.delimiter = delimiter;
        self
    }

    /// Quoting policy.
    #[must_use]
    pub fn quote_style(mut self, style: QuoteStyle) -> Self {
        self.options.encoder.quote_style = style;
        self
    }

    /// Write a header line to every file.
    #[must_use]
    pub fn header(mut self, header: bool) -> Self {
        self.options.encoder.header = header;
        self
    }

    /// Per-file buffer size in bytes.
    #[must_use]
    pub fn high_water_mark(mut self, bytes: usize) -> Self {
        self.options.high_water_mark = bytes;
        self
    }

    /// Compression codec for every file.
    #[must_use]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.options.compression = compression;
        self
    }

    /// Storage backend. Defaults to [`LocalFs`].
    #[must_use]
    pub fn filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Validate and build the sink.
    ///
    /// # Errors
    /// Returns [`SinkError::Config`] for an empty or path-like collection
    /// name, invalid options, or an unreadable current directory.
    pub fn build(self) -> Result<KeyedCsvSink> {
        if self.collection.is_empty() {
            return Err(SinkError::config("collection name must not be empty"));
        }
        if self.collection.contains(['/', '\\']) {
            return Err(SinkError::config(format!(
                "collection name {:?} must not contain path separators",
                self.collection
            )));
        }
        self.options.validate()?;

        let target_dir = match self.target_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => std::env::current_dir()
                .map_err(|e| SinkError::config(format!("resolve current directory: {e}")))?,
        };

        Ok(KeyedCsvSink {
            collection: self.collection,
            target_dir,
            options: self.options,
            fs: self.fs.unwrap_or_else(|| Arc::new(LocalFs)),
            state: SinkState::Open,
            directory: DirectoryState::Unknown,
            channels: Vec::new(),
            index: HashMap::new(),
            chunks: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_collection() {
        let err = KeyedCsvSink::builder("").build().unwrap_err();
        assert!(matches!(err, SinkError::Config { .. }));
    }

    #[test]
    fn rejects_collection_with_slash() {
        assert!(KeyedCsvSink::builder("a/b").build().is_err());
    }

    #[test]
    fn defaults_to_current_directory() {
        let sink = KeyedCsvSink::new("c", None, SinkOptions::default()).unwrap();
        assert_eq!(sink.target_dir(), std::env::current_dir().unwrap());
        assert_eq!(sink.state(), SinkState::Open);
        assert!(!sink.is_directory_ready());
    }

    #[test]
    fn finish_without_chunks_touches_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("never");
        let mut sink = KeyedCsvSink::builder("c").target_dir(&target).build().unwrap();
        let stats = sink.finish().unwrap();
        assert!(stats.files.is_empty());
        assert!(!target.exists());
        assert!(matches!(
            sink.finish().unwrap_err(),
            SinkError::Closed {
                state: SinkState::Finished
            }
        ));
    }

    #[test]
    fn state_display() {
        assert_eq!(SinkState::Aborted.to_string(), "aborted");
    }
}
