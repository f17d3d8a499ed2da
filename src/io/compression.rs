//! Output compression for per-key CSV files.
//!
//! Every channel can wrap its file in a compression codec. The codec is chosen
//! once per sink through [`SinkOptions::compression`](crate::options::SinkOptions)
//! and appends its extension after `.csv`, so `orders---eu.csv` becomes
//! `orders---eu.csv.gz` under [`Compression::Gzip`].
//!
//! ## Built-in Codecs
//!
//! When enabled via feature flags, the following codecs are available:
//! - **Gzip** (`.gz`) - via `flate2` crate (feature: `compression-gzip`)
//! - **Zstd** (`.zst`) - via `zstd` crate (feature: `compression-zstd`)
//! - **Bzip2** (`.bz2`) - via `bzip2` crate (feature: `compression-bzip2`)
//! - **Xz** (`.xz`) - via `xz2` crate (feature: `compression-xz`)
//!
//! Codecs that buffer internally are finished explicitly by
//! [`CompressedWriter::finish`] so trailer write errors reach the caller
//! instead of being swallowed on drop.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Boxed sequential byte sink handed out by a [`FileSystem`](crate::io::fs::FileSystem).
pub type DynWrite = Box<dyn Write + Send>;

/// Codec applied to output files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// Plain CSV, bit-exact file names.
    #[default]
    None,
    /// Gzip via `flate2`.
    Gzip,
    /// Zstandard via `zstd`.
    Zstd,
    /// Bzip2 via `bzip2`.
    Bzip2,
    /// Xz via `xz2`.
    Xz,
}

impl Compression {
    /// Human-readable codec name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Zstd => "zstd",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
        }
    }

    /// Suffix appended after `.csv`; empty for [`Compression::None`].
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Gzip => ".gz",
            Self::Zstd => ".zst",
            Self::Bzip2 => ".bz2",
            Self::Xz => ".xz",
        }
    }

    /// Whether the codec was compiled into this build.
    #[must_use]
    pub const fn is_available(self) -> bool {
        match self {
            Self::None => true,
            Self::Gzip => cfg!(feature = "compression-gzip"),
            Self::Zstd => cfg!(feature = "compression-zstd"),
            Self::Bzip2 => cfg!(feature = "compression-bzip2"),
            Self::Xz => cfg!(feature = "compression-xz"),
        }
    }

    /// Wrap a file writer with this codec.
    ///
    /// # Errors
    /// Returns an error if the codec fails to initialise or is not compiled in.
    pub fn wrap_writer(self, writer: DynWrite) -> io::Result<CompressedWriter> {
        match self {
            Self::None => Ok(CompressedWriter::Plain(writer)),
            #[cfg(feature = "compression-gzip")]
            Self::Gzip => Ok(CompressedWriter::Gzip(flate2::write::GzEncoder::new(
                writer,
                flate2::Compression::default(),
            ))),
            #[cfg(feature = "compression-zstd")]
            Self::Zstd => zstd::stream::write::Encoder::new(writer, 3).map(CompressedWriter::Zstd),
            #[cfg(feature = "compression-bzip2")]
            Self::Bzip2 => Ok(CompressedWriter::Bzip2(bzip2::write::BzEncoder::new(
                writer,
                bzip2::Compression::default(),
            ))),
            #[cfg(feature = "compression-xz")]
            Self::Xz => Ok(CompressedWriter::Xz(xz2::write::XzEncoder::new(writer, 6))),
            #[allow(unreachable_patterns)]
            other => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("compression codec {} is not enabled", other.name()),
            )),
        }
    }
}

/// A file writer, optionally behind a compression encoder.
pub enum CompressedWriter {
    /// No codec.
    Plain(DynWrite),
    #[cfg(feature = "compression-gzip")]
    Gzip(flate2::write::GzEncoder<DynWrite>),
    #[cfg(feature = "compression-zstd")]
    Zstd(zstd::stream::write::Encoder<'static, DynWrite>),
    #[cfg(feature = "compression-bzip2")]
    Bzip2(bzip2::write::BzEncoder<DynWrite>),
    #[cfg(feature = "compression-xz")]
    Xz(xz2::write::XzEncoder<DynWrite>),
}

impl CompressedWriter {
    /// Write the codec trailer (if any) and flush the underlying file.
    ///
    /// # Errors
    /// Returns the first I/O error raised while finishing or flushing.
    pub fn finish(self) -> io::Result<()> {
        let mut inner = match self {
            Self::Plain(w) => w,
            #[cfg(feature = "compression-gzip")]
            Self::Gzip(e) => e.finish()?,
            #[cfg(feature = "compression-zstd")]
            Self::Zstd(e) => e.finish()?,
            #[cfg(feature = "compression-bzip2")]
            Self::Bzip2(e) => e.finish()?,
            #[cfg(feature = "compression-xz")]
            Self::Xz(e) => e.finish()?,
        };
        inner.flush()
    }
}

impl Write for CompressedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            #[cfg(feature = "compression-gzip")]
            Self::Gzip(e) => e.write(buf),
            #[cfg(feature = "compression-zstd")]
            Self::Zstd(e) => e.write(buf),
            #[cfg(feature = "compression-bzip2")]
            Self::Bzip2(e) => e.write(buf),
            #[cfg(feature = "compression-xz")]
            Self::Xz(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            #[cfg(feature = "compression-gzip")]
            Self::Gzip(e) => e.flush(),
            #[cfg(feature = "compression-zstd")]
            Self::Zstd(e) => e.flush(),
            #[cfg(feature = "compression-bzip2")]
            Self::Bzip2(e) => e.flush(),
            #[cfg(feature = "compression-xz")]
            Self::Xz(e) => e.flush(),
        }
    }
}
