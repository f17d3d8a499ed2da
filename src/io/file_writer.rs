//! Sequential file writer sitting under a channel's CSV encoder.
//!
//! The encoder buffers up to the sink's high-water mark and then writes
//! through to this writer, which forwards to the (possibly compressed) file.
//! A blocking write here is what throttles the producer.
//!
//! [`FileWriter::destroy`] works through a shared reference so the channel can
//! poison the writer while the encoder still owns it: once destroyed, every
//! later write or flush fails and nothing more reaches the file.

use crate::io::compression::CompressedWriter;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// Byte-counting writer with a destroy switch.
pub struct FileWriter {
    out: CompressedWriter,
    destroyed: AtomicBool,
    bytes_written: u64,
}

impl FileWriter {
    /// Wrap an opened output.
    #[must_use]
    pub fn new(out: CompressedWriter) -> Self {
        Self {
            out,
            destroyed: AtomicBool::new(false),
            bytes_written: 0,
        }
    }

    /// Encoded bytes accepted so far (before compression).
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Refuse all further writes.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
    }

    /// Whether [`FileWriter::destroy`] has been called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Finish the codec and flush the file.
    ///
    /// # Errors
    /// Fails if the writer was destroyed or the underlying output fails.
    pub fn finish(self) -> io::Result<()> {
        if self.is_destroyed() {
            return Err(destroyed_error());
        }
        self.out.finish()
    }
}

fn destroyed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "file writer destroyed")
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.is_destroyed() {
            return Err(destroyed_error());
        }
        let n = self.out.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.is_destroyed() {
            return Err(destroyed_error());
        }
        self.out.flush()
    }
}
