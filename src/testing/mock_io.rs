//! Temporary directories and read-back helpers for sink output.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory that is automatically deleted when dropped.
pub struct TempDirPath {
    #[allow(dead_code)]
    temp_dir: TempDir,
    path: PathBuf,
}

impl TempDirPath {
    /// Create a new temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().to_path_buf();
        Ok(Self { temp_dir, path })
    }

    /// Get the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A path inside this directory that does not exist yet.
    #[must_use]
    pub fn child(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Default for TempDirPath {
    fn default() -> Self {
        Self::new().expect("Failed to create temporary directory")
    }
}

/// Sorted names of the regular files directly inside `dir`.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn list_files(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let dir = dir.as_ref();
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read_dir {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Read every record of a CSV file as raw string fields.
///
/// The file is read with the given delimiter and no header handling, so a
/// header line written by the sink comes back as the first record.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or parsed.
pub fn read_csv_records(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("parse CSV record #{}", i + 1))?;
        out.push(rec.iter().map(str::to_string).collect());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_path() {
        let temp_dir = TempDirPath::new().unwrap();
        assert!(temp_dir.path().is_dir());
        assert!(!temp_dir.child("x").exists());
    }

    #[test]
    fn test_list_files_skips_directories() {
        let temp_dir = TempDirPath::new().unwrap();
        fs::write(temp_dir.child("b.csv"), "").unwrap();
        fs::write(temp_dir.child("a.csv"), "").unwrap();
        fs::create_dir(temp_dir.child("sub")).unwrap();
        assert_eq!(list_files(temp_dir.path()).unwrap(), vec!["a.csv", "b.csv"]);
    }

    #[test]
    fn test_read_csv_records() {
        let temp_dir = TempDirPath::new().unwrap();
        let path = temp_dir.child("r.csv");
        fs::write(&path, "1,\"a,b\"\n2,c\n").unwrap();
        let records = read_csv_records(&path, b',').unwrap();
        assert_eq!(records, vec![vec!["1", "a,b"], vec!["2", "c"]]);
    }
}
