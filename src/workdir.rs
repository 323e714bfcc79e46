//! Scoped change of the process working directory.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{BenchError, Result};

/// Enters a directory on construction and returns to the previous one when
/// dropped, including during unwinding and early `?` returns.
///
/// The working directory is process-global: hold at most one guard at a time
/// and never across threads.
#[derive(Debug)]
pub struct WorkingDirectory {
    original: PathBuf,
    current: PathBuf,
}

impl WorkingDirectory {
    pub fn enter<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let original = env::current_dir().map_err(|e| BenchError::io(".", e))?;
        info!("Entering directory `{}'", dir.display());
        env::set_current_dir(dir).map_err(|e| BenchError::io(dir, e))?;
        Ok(Self {
            original,
            current: dir.to_path_buf(),
        })
    }

    /// Directory that was current before the guard was created.
    pub fn original(&self) -> &Path {
        &self.original
    }
}

impl Drop for WorkingDirectory {
    fn drop(&mut self) {
        info!("Leaving directory `{}'", self.current.display());
        if let Err(e) = env::set_current_dir(&self.original) {
            warn!(
                "failed to restore working directory {}: {e}",
                self.original.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn test_restores_on_drop() {
        let before = env::current_dir().unwrap();
        let dir = tempdir().unwrap();
        {
            let guard = WorkingDirectory::enter(dir.path()).unwrap();
            assert_eq!(guard.original(), before.as_path());
            assert_eq!(
                env::current_dir().unwrap().canonicalize().unwrap(),
                dir.path().canonicalize().unwrap()
            );
        }
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    #[serial]
    fn test_restores_on_error_path() {
        let before = env::current_dir().unwrap();
        let dir = tempdir().unwrap();

        fn failing(dir: &Path) -> Result<()> {
            let _guard = WorkingDirectory::enter(dir)?;
            Err(BenchError::EmptyCommand)
        }

        assert!(failing(dir.path()).is_err());
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    #[serial]
    fn test_missing_directory_is_an_error() {
        let before = env::current_dir().unwrap();
        let dir = tempdir().unwrap();
        let err = WorkingDirectory::enter(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, BenchError::Io { .. }));
        assert_eq!(env::current_dir().unwrap(), before);
    }
}
