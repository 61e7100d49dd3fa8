use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use getset::Getters;
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use tracing::debug;

pub static LOCK_FILE_NAME: &str = ".pg_backup.lock";

/// Exclusive advisory lock on a backup directory, released on drop.
#[derive(Debug, Getters)]
pub struct BackupLock {
    #[allow(dead_code)]
    file: File,
    #[getset(get = "pub")]
    path: PathBuf,
}

impl BackupLock {
    /// Takes the lock without waiting; a held lock is reported as [`Error::Locked`].
    pub fn acquire(backup_dir: &Path) -> Result<Self> {
        let path = backup_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(Error::from)
            .with_msg(format!("Cannot open lock file {:?}", path))?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Err(Error::Locked(path)),
            Err(TryLockError::Error(e)) => {
                return Err(Error::from(e).with_msg(format!("Cannot lock {:?}", path)))
            }
        }

        debug!("Acquired lock {:?}", path);
        Ok(Self { file, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_is_refused() {
        let tmp = TempDir::new().unwrap();
        let lock = BackupLock::acquire(tmp.path()).unwrap();
        assert_eq!(lock.path(), &tmp.path().join(LOCK_FILE_NAME));

        match BackupLock::acquire(tmp.path()) {
            Err(Error::Locked(path)) => assert_eq!(path, tmp.path().join(LOCK_FILE_NAME)),
            other => panic!("Expected lock contention, got {other:?}"),
        }
    }

    #[test]
    fn test_lock_is_released_on_drop() {
        let tmp = TempDir::new().unwrap();
        drop(BackupLock::acquire(tmp.path()).unwrap());
        BackupLock::acquire(tmp.path()).unwrap();
    }

    #[test]
    fn test_missing_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = BackupLock::acquire(&tmp.path().join("missing")).unwrap_err();
        assert!(matches!(err.root(), Error::Io(_)));
    }
}
