//! Testing utilities for code that writes through a [`KeyedCsvSink`](crate::KeyedCsvSink).
//!
//! This module provides:
//!
//! - **Fixtures**: ready-made chunks covering plain rows, envelopes, empty
//!   sequences and keys that need escaping
//! - **Assertions**: check which files a sink produced and what they contain
//! - **Mock I/O**: temporary target directories and CSV read-back helpers
//! - **Fault injection**: [`FaultyFs`], a [`FileSystem`](crate::io::fs::FileSystem)
//!   that fails on demand
//!
//! # Quick Start
//!
//! ```no_run
//! use keyed_csv_sink::KeyedCsvSink;
//! use keyed_csv_sink::testing::*;
//!
//! #[test]
//! fn writes_one_file_per_key() -> anyhow::Result<()> {
//!     let dir = TempDirPath::new()?;
//!     let mut sink = KeyedCsvSink::builder("users").target_dir(dir.path()).build()?;
//!     sink.write_chunk(&sample_users_chunk())?;
//!     sink.finish()?;
//!
//!     assert_output_files(dir.path(), &["users---admins.csv", "users---guests.csv"]);
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod faulty_fs;
pub mod fixtures;
pub mod mock_io;

// Re-export commonly used items
pub use assertions::*;
pub use faulty_fs::*;
pub use fixtures::*;
pub use mock_io::*;
