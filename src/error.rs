//! Error types for the keyed CSV sink.
//!
//! Every failure the sink can report is a [`SinkError`]. Errors fall into the
//! groups exposed by [`ErrorKind`]; the group decides what happens to the sink:
//!
//! - [`ErrorKind::Configuration`] is raised at construction time.
//! - [`ErrorKind::InputShape`] fails only the current `write_chunk` call. Rows
//!   already written for earlier keys of the same chunk stay written.
//! - [`ErrorKind::Filesystem`] and [`ErrorKind::Upstream`] are fatal: every open
//!   channel is destroyed and the sink stops accepting input.
//! - [`ErrorKind::Closed`] is returned for any call after finish or abort.

use crate::sink::SinkState;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;

/// Broad classification of a [`SinkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid constructor arguments or options.
    Configuration,
    /// A chunk, envelope or row did not have the expected shape.
    InputShape,
    /// Directory check/create, file open, write or flush failed.
    Filesystem,
    /// The sink was already finished or aborted.
    Closed,
    /// The upstream producer reported an error.
    Upstream,
}

/// Errors that can occur while writing keyed chunks to CSV files.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Constructor arguments or options were rejected.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the rejected setting.
        message: String,
    },

    /// The chunk itself was not a key-to-rows mapping.
    #[error("chunk must be a mapping of key to rows, got {found}")]
    InvalidChunk {
        /// JSON type name of the offending value.
        found: &'static str,
    },

    /// An object value was neither a row sequence nor a `{data, metadata}` envelope.
    #[error("invalid data+metadata format in chunk of '{key}'")]
    InvalidEnvelope {
        /// Entity key whose value was rejected.
        key: String,
    },

    /// The value (or envelope `data`) under a key was not a row sequence.
    #[error("invalid data format in chunk of '{key}': expected a sequence of rows")]
    InvalidData {
        /// Entity key whose value was rejected.
        key: String,
    },

    /// A row was not a field mapping.
    #[error("invalid row #{index} in chunk of '{key}': expected a field mapping")]
    InvalidRow {
        /// Entity key the row belongs to.
        key: String,
        /// Position of the row within its sequence.
        index: usize,
    },

    /// The target path exists but is not a directory.
    #[error("target path {} exists and is not a directory", path.display())]
    NotADirectory {
        /// The configured target directory.
        path: PathBuf,
    },

    /// Inspecting the target directory failed.
    #[error("failed to inspect target directory {}", path.display())]
    DirectoryCheck {
        /// The configured target directory.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// Creating the target directory failed.
    #[error("failed to create target directory {}", path.display())]
    DirectoryCreate {
        /// The configured target directory.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// Opening an output file (or its encoder) failed.
    #[error("failed to open {}", path.display())]
    Open {
        /// Output file path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// Encoding or writing a row failed.
    #[error("failed to write to {}", path.display())]
    Write {
        /// Output file path.
        path: PathBuf,
        /// Underlying encoder failure.
        #[source]
        source: csv::Error,
    },

    /// Flushing or closing an output file failed.
    #[error("failed to flush {}", path.display())]
    Flush {
        /// Output file path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The sink no longer accepts input.
    #[error("sink is {state} and no longer accepts input")]
    Closed {
        /// Terminal state the sink is in.
        state: SinkState,
    },

    /// The producer feeding the sink failed.
    #[error("upstream producer failed")]
    Upstream {
        /// The producer's error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SinkError {
    /// Build a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap a producer error.
    pub fn upstream<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Upstream {
            source: Box::new(source),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Configuration,
            Self::InvalidChunk { .. }
            | Self::InvalidEnvelope { .. }
            | Self::InvalidData { .. }
            | Self::InvalidRow { .. } => ErrorKind::InputShape,
            Self::NotADirectory { .. }
            | Self::DirectoryCheck { .. }
            | Self::DirectoryCreate { .. }
            | Self::Open { .. }
            | Self::Write { .. }
            | Self::Flush { .. } => ErrorKind::Filesystem,
            Self::Closed { .. } => ErrorKind::Closed,
            Self::Upstream { .. } => ErrorKind::Upstream,
        }
    }

    /// Whether the error only fails the current call and leaves the sink open.
    #[must_use]
    pub const fn is_input_shape(&self) -> bool {
        matches!(self.kind(), ErrorKind::InputShape)
    }

    /// Whether the error tears down the whole sink.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Filesystem | ErrorKind::Upstream)
    }
}
