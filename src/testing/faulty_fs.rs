//! Fault-injecting filesystem for exercising error and abort paths.
//!
//! [`FaultyFs`] delegates to [`LocalFs`] and fails selected operations:
//!
//! ```
//! use keyed_csv_sink::testing::FaultyFs;
//! use std::io::ErrorKind;
//!
//! let fs = FaultyFs::new()
//!     .fail_open_matching("---broken", ErrorKind::PermissionDenied)
//!     .fail_writes_after(1024);
//! assert!(fs.opened_files().is_empty());
//! ```

use crate::io::compression::DynWrite;
use crate::io::fs::{EntryKind, FileSystem, LocalFs};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A [`FileSystem`] that records what it did and fails on request.
#[derive(Clone, Default)]
pub struct FaultyFs {
    metadata_error: Option<ErrorKind>,
    create_dir_error: Option<ErrorKind>,
    open_failure: Option<(String, ErrorKind)>,
    write_budget: Option<usize>,
    opened: Arc<Mutex<Vec<PathBuf>>>,
    dropped: Arc<Mutex<Vec<PathBuf>>>,
    created_dirs: Arc<Mutex<Vec<PathBuf>>>,
}

impl FaultyFs {
    /// A filesystem that behaves like [`LocalFs`] until configured otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `metadata` call with `kind`.
    #[must_use]
    pub fn fail_metadata(mut self, kind: ErrorKind) -> Self {
        self.metadata_error = Some(kind);
        self
    }

    /// Fail every `create_dir` call with `kind`.
    #[must_use]
    pub fn fail_create_dir(mut self, kind: ErrorKind) -> Self {
        self.create_dir_error = Some(kind);
        self
    }

    /// Fail `create_file` for paths whose file name contains `needle`.
    #[must_use]
    pub fn fail_open_matching(mut self, needle: impl Into<String>, kind: ErrorKind) -> Self {
        self.open_failure = Some((needle.into(), kind));
        self
    }

    /// Let each opened file accept `bytes` bytes, then fail every write.
    #[must_use]
    pub fn fail_writes_after(mut self, bytes: usize) -> Self {
        self.write_budget = Some(bytes);
        self
    }

    /// Paths handed out by `create_file`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn opened_files(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }

    /// Paths whose writer has been released, in the order they were released.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn dropped_files(&self) -> Vec<PathBuf> {
        self.dropped.lock().unwrap().clone()
    }

    /// Directories created through `create_dir`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn created_dirs(&self) -> Vec<PathBuf> {
        self.created_dirs.lock().unwrap().clone()
    }
}

impl FileSystem for FaultyFs {
    fn metadata(&self, path: &Path) -> io::Result<EntryKind> {
        if let Some(kind) = self.metadata_error {
            return Err(io::Error::new(kind, "injected metadata failure"));
        }
        LocalFs.metadata(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        if let Some(kind) = self.create_dir_error {
            return Err(io::Error::new(kind, "injected create_dir failure"));
        }
        LocalFs.create_dir(path)?;
        self.created_dirs.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn create_file(&self, path: &Path) -> io::Result<DynWrite> {
        if let Some((needle, kind)) = &self.open_failure {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            if name.contains(needle.as_str()) {
                return Err(io::Error::new(*kind, "injected open failure"));
            }
        }
        let file = LocalFs.create_file(path)?;
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(Box::new(TrackedWriter {
            inner: file,
            remaining: self.write_budget,
            path: path.to_path_buf(),
            dropped: Arc::clone(&self.dropped),
        }))
    }
}

/// Writer that fails once its byte budget (if any) is spent and records when
/// it is released.
struct TrackedWriter {
    inner: DynWrite,
    remaining: Option<usize>,
    path: PathBuf,
    dropped: Arc<Mutex<Vec<PathBuf>>>,
}

impl Write for TrackedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(remaining) = self.remaining else {
            return self.inner.write(buf);
        };
        if remaining == 0 {
            return Err(io::Error::other("injected write failure: disk full"));
        }
        let n = buf.len().min(remaining);
        let written = self.inner.write(&buf[..n])?;
        self.remaining = Some(remaining - written);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Drop for TrackedWriter {
    fn drop(&mut self) {
        if let Ok(mut dropped) = self.dropped.lock() {
            dropped.push(std::mem::take(&mut self.path));
        }
    }
}
