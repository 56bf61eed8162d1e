//! Single-slot local checkpoint of an enriched batch awaiting persistence.
//!
//! The file is a pretty-printed JSON array of items. It is written once the
//! batch is fully enriched, read before any generation work, and removed only
//! after the store confirms the append.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use dailyvocab_shared::{Batch, Result, VocabError, VocabularyItem};

/// Handle to the checkpoint file at a fixed path.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a checkpoint file is present (valid or not).
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Overwrite the checkpoint with `batch`.
    ///
    /// Writes a sibling temp file and renames it over the target, so readers
    /// see either the old or the new content.
    pub fn save(&self, batch: &[VocabularyItem]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| VocabError::io(parent, e))?;
            }
        }

        let json = serde_json::to_string_pretty(batch)
            .map_err(|e| VocabError::validation(format!("cannot serialize batch: {e}")))?;

        let tmp = self.temp_path();
        std::fs::write(&tmp, json).map_err(|e| VocabError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| VocabError::io(&self.path, e))?;

        info!(path = %self.path.display(), items = batch.len(), "checkpoint saved");
        Ok(())
    }

    /// Read the pending batch. Missing, empty, or unreadable files are `None`.
    pub fn load(&self) -> Option<Batch> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no checkpoint");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read checkpoint, ignoring it");
                return None;
            }
        };

        if content.trim().is_empty() {
            warn!(path = %self.path.display(), "checkpoint file is empty, ignoring it");
            return None;
        }

        match serde_json::from_str::<Batch>(&content) {
            Ok(batch) if batch.is_empty() => {
                warn!(path = %self.path.display(), "checkpoint holds no items, ignoring it");
                None
            }
            Ok(batch) => Some(batch),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "checkpoint is not a valid batch, ignoring it");
                None
            }
        }
    }

    /// Delete the checkpoint. A missing file is not an error.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "checkpoint cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VocabError::io(&self.path, e)),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
