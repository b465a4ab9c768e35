//! Best-effort temp file removal
//!
//! Deletion failures are logged and swallowed: cleanup never replaces the
//! error that triggered it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Remove `path`, ignoring a file that is already gone.
///
/// Returns true when a file was deleted.
pub fn remove_quietly(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed temp file");
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove temp file");
            false
        }
    }
}

/// Remove every file in `dir` named `<id>.*` or `<id>_*`.
///
/// Catches what a killed tool leaves next to its declared output, such as
/// `.part` fragments. Returns the number of files deleted.
pub async fn remove_job_files(dir: &Path, id: &str) -> usize {
    let dotted = format!("{}.", id);
    let suffixed = format!("{}_", id);

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Cannot list temp dir");
            return 0;
        }
    };

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if (name.starts_with(&dotted) || name.starts_with(&suffixed)) && remove_quietly(&entry.path()) {
            removed += 1;
        }
    }
    removed
}

/// RAII guard over the temp files of one job.
///
/// Every tracked path still present when the guard drops is removed, so an
/// early return or a panic cannot strand a file.
#[derive(Debug, Default)]
pub struct TempFiles {
    paths: Vec<PathBuf>,
}

impl TempFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take responsibility for `path` (which may not exist yet)
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Delete `path` now and stop tracking it
    pub fn discard(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
        remove_quietly(path);
    }

    /// Hand `path` to another owner; the guard will no longer delete it
    pub fn release(&mut self, path: &Path) -> Option<PathBuf> {
        let idx = self.paths.iter().position(|p| p == path)?;
        Some(self.paths.swap_remove(idx))
    }

    pub fn tracked(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            remove_quietly(&path);
        }
    }
}
