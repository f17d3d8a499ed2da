//! Filesystem seam used by the sink.
//!
//! The sink needs three things from storage: inspect the target directory,
//! create it (one level) and open sequential byte writers. [`LocalFs`] maps
//! those onto `std::fs`; tests swap in fault-injecting implementations.

use crate::io::compression::DynWrite;
use std::fs;
use std::io;
use std::path::Path;

/// What a path currently points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory (symlinks are followed).
    Directory,
    /// A regular file.
    File,
    /// Anything else: sockets, devices, fifos.
    Other,
}

/// Storage operations the sink relies on.
///
/// `metadata` must report a missing path with [`io::ErrorKind::NotFound`] so
/// the sink can tell "create it" apart from a real failure.
pub trait FileSystem: Send + Sync {
    /// Inspect `path`.
    ///
    /// # Errors
    /// `NotFound` when nothing exists at `path`; any other error is fatal.
    fn metadata(&self, path: &Path) -> io::Result<EntryKind>;

    /// Create a single directory; parents are not created.
    ///
    /// # Errors
    /// Returns an error if the parent is missing or the directory cannot be made.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Create (or truncate) a file and return a sequential writer for it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    fn create_file(&self, path: &Path) -> io::Result<DynWrite>;
}

/// [`FileSystem`] backed by the local disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn metadata(&self, path: &Path) -> io::Result<EntryKind> {
        let md = fs::metadata(path)?;
        Ok(if md.is_dir() {
            EntryKind::Directory
        } else if md.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        })
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn create_file(&self, path: &Path) -> io::Result<DynWrite> {
        Ok(Box::new(fs::File::create(path)?))
    }
}
