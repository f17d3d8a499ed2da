//! Assertion functions for checking sink output on disk.

use crate::testing::mock_io::{list_files, read_csv_records};
use std::path::Path;

/// Assert that `dir` contains exactly the files named in `expected`.
///
/// # Panics
///
/// Panics if the directory cannot be listed, or if any file is missing or extra.
pub fn assert_output_files(dir: impl AsRef<Path>, expected: &[&str]) {
    let dir = dir.as_ref();
    let actual = list_files(dir)
        .unwrap_or_else(|e| panic!("Cannot list output directory {}: {e:#}", dir.display()));
    let mut expected: Vec<String> = expected.iter().map(|s| (*s).to_string()).collect();
    expected.sort();

    let missing: Vec<_> = expected.iter().filter(|e| !actual.contains(e)).collect();
    let extra: Vec<_> = actual.iter().filter(|a| !expected.contains(a)).collect();
    assert!(
        missing.is_empty() && extra.is_empty(),
        "Output file mismatch in {}:\n  Missing: {missing:?}\n  Extra: {extra:?}\n  Actual: {actual:?}",
        dir.display()
    );
}

/// Assert that a comma-delimited CSV file holds exactly `expected`, record by record.
///
/// # Panics
///
/// Panics if the file cannot be read or any record differs.
pub fn assert_csv_rows(path: impl AsRef<Path>, expected: &[&[&str]]) {
    assert_csv_rows_with_delimiter(path, b',', expected);
}

/// Like [`assert_csv_rows`] for files written with another delimiter.
///
/// # Panics
///
/// Panics if the file cannot be read or any record differs.
pub fn assert_csv_rows_with_delimiter(path: impl AsRef<Path>, delimiter: u8, expected: &[&[&str]]) {
    let path = path.as_ref();
    let actual = read_csv_records(path, delimiter)
        .unwrap_or_else(|e| panic!("Cannot read {}: {e:#}", path.display()));

    assert_eq!(
        actual.len(),
        expected.len(),
        "Record count mismatch in {}:\n  Expected: {expected:?}\n  Actual: {actual:?}",
        path.display()
    );
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert_eq!(
            a,
            e,
            "Record mismatch at index {i} in {}:\n  Expected: {e:?}\n  Actual: {a:?}",
            path.display()
        );
    }
}
