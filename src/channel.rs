//! Per-key output channel.
//!
//! A [`KeyedChannel`] is the single resource the sink manages for a key: a CSV
//! encoder with a frozen column list, feeding a [`FileWriter`] at the key's
//! path. It exposes exactly three operations: write a row, end gracefully and
//! destroy.

use crate::chunk::Row;
use crate::encoder::CsvEncoder;
use crate::error::{Result, SinkError};
use crate::io::file_writer::FileWriter;
use crate::io::fs::FileSystem;
use crate::options::SinkOptions;
use crate::stats::FileStats;
use std::path::{Path, PathBuf};
use tracing::debug;

pub(crate) struct KeyedChannel {
    key: String,
    path: PathBuf,
    encoder: CsvEncoder<FileWriter>,
}

impl KeyedChannel {
    /// Create the file at `path` and an encoder over it.
    pub(crate) fn open(
        fs: &dyn FileSystem,
        key: &str,
        path: PathBuf,
        columns: Vec<String>,
        options: &SinkOptions,
    ) -> Result<Self> {
        let open_err = |source| SinkError::Open {
            path: path.clone(),
            source,
        };
        let file = fs.create_file(&path).map_err(open_err)?;
        let out = options.compression.wrap_writer(file).map_err(open_err)?;
        let builder = options.encoder.writer_builder(options.high_water_mark)?;
        let encoder = CsvEncoder::new(FileWriter::new(out), &builder, columns, &options.encoder)
            .map_err(|source| SinkError::Write {
                path: path.clone(),
                source,
            })?;
        debug!(
            key,
            path = %path.display(),
            columns = encoder.columns().len(),
            "opened output channel"
        );
        Ok(Self {
            key: key.to_string(),
            path,
            encoder,
        })
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn write_row(&mut self, row: &Row) -> Result<()> {
        self.encoder.write_row(row).map_err(|source| SinkError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Flush everything to the file and close it.
    pub(crate) fn end(self) -> Result<FileStats> {
        let columns = self.encoder.columns().to_vec();
        let rows = self.encoder.rows_written();
        let flush_err = |source| SinkError::Flush {
            path: self.path.clone(),
            source,
        };
        let writer = self.encoder.into_inner().map_err(flush_err)?;
        let bytes = writer.bytes_written();
        writer.finish().map_err(flush_err)?;
        debug!(key = %self.key, rows, bytes, "closed output channel");
        Ok(FileStats {
            key: self.key,
            path: self.path,
            columns,
            rows,
            bytes,
        })
    }

    /// Tear down without flushing buffered rows.
    pub(crate) fn destroy(self) {
        self.encoder.get_ref().destroy();
        debug!(key = %self.key, "destroyed output channel");
    }
}
