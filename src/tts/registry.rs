//! [`TempAudioRegistry`] — every synthesized audio file the process created.
//!
//! Files are created with `tempfile` and persisted so the audio backend can
//! open them by path.  The registry only ever grows while the application
//! runs; [`TempAudioRegistry::cleanup`] removes whatever is left at shutdown.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

const FILE_PREFIX: &str = "voice-translator-";
const FILE_SUFFIX: &str = ".mp3";

#[derive(Debug, Clone, Default)]
pub struct TempAudioRegistry {
    dir: Option<PathBuf>,
    files: Arc<Mutex<Vec<PathBuf>>>,
}

impl TempAudioRegistry {
    /// Registry that writes into the system temp directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that writes into `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            files: Arc::default(),
        }
    }

    /// Write `bytes` to a new temporary `.mp3` file and register it.
    pub fn store(&self, bytes: &[u8]) -> io::Result<PathBuf> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(FILE_PREFIX).suffix(FILE_SUFFIX);
        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;

        let (_, path) = file.keep().map_err(|e| e.error)?;
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.clone());
        Ok(path)
    }

    /// Delete one file early.  It stays registered; cleanup skips it.
    pub fn discard(&self, path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("registry: failed to remove {}: {e}", path.display());
            }
        }
    }

    /// Number of files created so far.
    pub fn len(&self) -> usize {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every registered file that still exists.  Returns how many
    /// were removed.
    pub fn cleanup(&self) -> usize {
        let files = std::mem::take(
            &mut *self.files.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let mut removed = 0;
        for path in files {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("registry: failed to remove {}: {e}", path.display()),
            }
        }
        if removed > 0 {
            log::info!("registry: removed {removed} temporary audio file(s)");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_writes_and_registers() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TempAudioRegistry::in_dir(dir.path());

        let path = registry.store(b"abc").unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(path.to_string_lossy().ends_with(".mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn cleanup_removes_remaining_files() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TempAudioRegistry::in_dir(dir.path());

        let a = registry.store(b"a").unwrap();
        let b = registry.store(b"b").unwrap();
        registry.discard(&a);

        assert_eq!(registry.cleanup(), 1);
        assert!(!a.exists());
        assert!(!b.exists());
        assert!(registry.is_empty());
    }

    #[test]
    fn clones_share_the_list() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TempAudioRegistry::in_dir(dir.path());
        let clone = registry.clone();
        clone.store(b"x").unwrap();
        assert_eq!(registry.len(), 1);
    }
}
