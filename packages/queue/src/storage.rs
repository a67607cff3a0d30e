// ABOUTME: Atomic JSON persistence for queue records
// ABOUTME: Write-then-rename protocol plus an ordered directory scan iterator

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

/// Serialize `value` and atomically install it at `path`
///
/// The record is written to a hidden sibling temp file and renamed into
/// place, so readers never observe a partial write. Parent directories are
/// created as needed.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "record".to_string());
    let tmp = path.with_file_name(format!(
        ".{}.tmp-{}",
        file_name,
        &Uuid::new_v4().simple().to_string()[..8]
    ));

    let bytes = serde_json::to_vec_pretty(value)?;
    fs::write(&tmp, bytes)?;

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    debug!("Wrote record {}", path.display());
    Ok(())
}

/// Read and deserialize a JSON record
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Create an empty marker file, including parent directories
///
/// Marker content is never authoritative; only existence matters.
pub fn touch_marker(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"")?;
    Ok(())
}

/// Ordered iterator over the visible files of a directory
///
/// Hidden files (including in-progress `.{name}.tmp-*` writes) are skipped,
/// and entries come out in lexical order so timestamp-prefixed ids scan
/// FIFO-ish. A missing directory yields an empty iterator.
pub struct ScanDir {
    entries: std::vec::IntoIter<PathBuf>,
}

impl Iterator for ScanDir {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        self.entries.next()
    }
}

/// Scan `dir` for files carrying `extension` (e.g. "json", "trigger")
pub fn scan_files(dir: &Path, extension: &str) -> Result<ScanDir> {
    let mut paths = Vec::new();

    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            if path.extension().map(|e| e == extension).unwrap_or(false) {
                paths.push(path);
            }
        }
        paths.sort();
    }

    Ok(ScanDir {
        entries: paths.into_iter(),
    })
}

/// List the names of immediate subdirectories, sorted
pub fn scan_subdirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();

    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Record {
        name: String,
        count: u64,
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("record.json");
        let record = Record {
            name: "w1".to_string(),
            count: 3,
        };

        write_json_atomic(&path, &record).unwrap();
        let loaded: Record = read_json(&path).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn scan_skips_hidden_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", ".a.json.tmp-1234", "c.trigger"] {
            fs::write(dir.path().join(name), b"{}").unwrap();
        }

        let names: Vec<String> = scan_files(dir.path(), "json")
            .unwrap()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn scan_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(scan_files(&missing, "json").unwrap().count(), 0);
        assert!(scan_subdirs(&missing).unwrap().is_empty());
    }
}
