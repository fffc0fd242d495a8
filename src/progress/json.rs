//! JSON file implementation of the progress store

use crate::progress::traits::{ProgressResult, ProgressStore};
use crate::progress::ProgressState;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Progress store backed by a pretty-printed JSON file
///
/// State is re-read from disk on every operation so external edits (or a
/// second handle on the same file) are observed. Writes go through a
/// temporary file in the same directory and an atomic rename.
pub struct JsonProgressStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonProgressStore {
    /// Opens a store at `path`; the file is created on the first mark
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the backing file, starting the next run from scratch
    pub fn reset(&self) -> ProgressResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads the state from disk, treating a missing or unreadable file as empty
    fn load(&self) -> ProgressState {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ProgressState::default();
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read progress file {}: {}; starting fresh",
                    self.path.display(),
                    e
                );
                return ProgressState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    "Progress file {} is corrupt: {}; starting fresh",
                    self.path.display(),
                    e
                );
                ProgressState::default()
            }
        }
    }

    /// Writes the full state atomically
    fn save(&self, state: &ProgressState) -> ProgressResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(state)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.flush()?;
        tmp.persist(&self.path)?;
        Ok(())
    }

    /// Runs one load-modify-save cycle under the store's lock
    fn update<F>(&self, apply: F) -> ProgressResult<()>
    where
        F: FnOnce(&mut ProgressState) -> bool,
    {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut state = self.load();
        if apply(&mut state) {
            self.save(&state)?;
        }
        Ok(())
    }
}

impl ProgressStore for JsonProgressStore {
    fn is_guide_done(&self, url: &str) -> bool {
        self.load().is_guide_done(url)
    }

    fn is_tutorial_done(&self, url: &str) -> bool {
        self.load().is_tutorial_done(url)
    }

    fn mark_guide_done(&self, url: &str) -> ProgressResult<()> {
        self.update(|state| state.insert_guide(url))
    }

    fn mark_tutorial_done(&self, url: &str) -> ProgressResult<()> {
        self.update(|state| state.insert_tutorial(url))
    }

    fn mark_tutorial_failed(&self, url: &str, reason: &str) -> ProgressResult<()> {
        self.update(|state| state.insert_failure(url, reason))
    }

    fn snapshot(&self) -> ProgressState {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load()
    }
}
