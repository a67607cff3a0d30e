// ABOUTME: Per-request scratch directory lifecycle
// ABOUTME: Materializes request files and guarantees removal on every exit path

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

/// A request-scoped scratch directory, removed when dropped
///
/// The directory is bind-mounted into the container as its working directory;
/// nothing in it survives the request, whatever the outcome.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create the scratch directory and write the request's files into it
    ///
    /// Intermediate subdirectories are created as needed. File names are
    /// validated upstream; this only does the I/O.
    pub fn materialize(
        parent: &Path,
        request_id: &str,
        files: &HashMap<String, String>,
    ) -> Result<Self> {
        let path = parent.join(format!("corral-sandbox-{}", request_id));
        fs::create_dir_all(&path)?;
        let scratch = Self { path };

        for (name, content) in files {
            let target = scratch.path.join(name);
            if let Some(dir) = target.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::write(&target, content)?;
        }

        debug!(
            "Materialized {} file(s) into {}",
            files.len(),
            scratch.path.display()
        );
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove scratch directory {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materializes_nested_files() {
        let parent = tempfile::tempdir().unwrap();
        let mut files = HashMap::new();
        files.insert("main.py".to_string(), "print(2+2)\n".to_string());
        files.insert("data/input.txt".to_string(), "42".to_string());

        let scratch = ScratchDir::materialize(parent.path(), "r1", &files).unwrap();
        assert_eq!(
            fs::read_to_string(scratch.path().join("main.py")).unwrap(),
            "print(2+2)\n"
        );
        assert_eq!(
            fs::read_to_string(scratch.path().join("data/input.txt")).unwrap(),
            "42"
        );
    }

    #[test]
    fn drop_removes_the_directory() {
        let parent = tempfile::tempdir().unwrap();
        let path;
        {
            let scratch =
                ScratchDir::materialize(parent.path(), "r2", &HashMap::new()).unwrap();
            path = scratch.path().to_path_buf();
            assert!(path.is_dir());
        }
        assert!(!path.exists());
    }
}
