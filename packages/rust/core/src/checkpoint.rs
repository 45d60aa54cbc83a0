//! Durable resume position: the id of the last reply flushed to output.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use contextpairs_shared::{ContextPairsError, Result};
use tracing::debug;

/// Persistence for the checkpoint id, injected into the assembler.
pub trait CheckpointStore {
    /// Current checkpoint, or `None` when starting from scratch.
    fn load(&self) -> Result<Option<String>>;

    /// Replace the checkpoint with `id`.
    fn save(&mut self, id: &str) -> Result<()>;

    /// Forget the checkpoint so the next run starts at the first row.
    fn clear(&mut self) -> Result<()>;
}

/// Plain-text file holding exactly one id.
///
/// Saves go to a sibling temp file which is then renamed over the target, so a
/// crash mid-write leaves the previous checkpoint intact.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    path: PathBuf,
}

impl FileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "checkpoint".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CheckpointStore for FileCheckpoint {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let id = content.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ContextPairsError::io(&self.path, e)),
        }
    }

    fn save(&mut self, id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ContextPairsError::io(parent, e))?;
        }

        let tmp = self.temp_path();
        let mut file = File::create(&tmp).map_err(|e| ContextPairsError::io(&tmp, e))?;
        file.write_all(id.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| ContextPairsError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| ContextPairsError::io(&self.path, e))?;

        debug!(path = %self.path.display(), id, "checkpoint saved");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ContextPairsError::io(&self.path, e)),
        }
    }
}
