use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::convert_error_vec;
use crate::backup::result_error::WithMsg;
use getset::Getters;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of a best-effort removal of expired generations.
#[derive(Debug, Default, Getters)]
#[getset(get = "pub")]
pub struct PruneResult {
    removed: Vec<PathBuf>,
    failed: Vec<PathBuf>,
    #[getset(skip)]
    errors: Vec<Error>,
}

impl PruneResult {
    /// All failures merged into one error, `None` when every path was removed.
    pub fn into_error(self) -> Option<Error> {
        convert_error_vec(self.errors).err()
    }
}

/// Deletes one expired generation directory.
pub trait GenerationRemover {
    fn remove(&self, path: &Path) -> std::io::Result<()>;
}

/// Recursive removal from the filesystem.
pub struct RemoveDirAll;

impl GenerationRemover for RemoveDirAll {
    fn remove(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_dir_all(path)
    }
}

/// Removes each path, carrying on past the ones that fail.
pub fn prune<P, I, R>(paths: I, remover: &R) -> PruneResult
where
    P: AsRef<Path>,
    I: IntoIterator<Item = P>,
    R: GenerationRemover,
{
    let mut result = PruneResult::default();
    for path in paths {
        let path = path.as_ref();
        info!("Removing out of retention backup {:?}", path);
        match remover.remove(path) {
            Ok(()) => result.removed.push(path.to_path_buf()),
            Err(e) => {
                warn!("Failed to remove {:?}: {e}", path);
                result.failed.push(path.to_path_buf());
                result
                    .errors
                    .push(Error::from(e).with_msg(format!("Remove {:?} failed", path)));
            }
        }
    }
    result
}
