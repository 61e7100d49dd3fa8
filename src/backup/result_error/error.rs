use crate::backup::dump::DumpRequest;
use crate::backup::pg_command::ProcessFailure;
use crate::backup::result_error::WithMsg;
use itertools::Itertools;
use std::fmt::Debug;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    SerdeYml(#[from] serde_yml::Error),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[error("No readable configuration found, searched: {}", .searched.iter().map(|p| format!("{p:?}")).join(", "))]
    ConfigNotFound { searched: Vec<PathBuf> },
    #[error("Backups must run as {required:?} but the current user is {actual:?}")]
    Permission { required: String, actual: String },
    #[error("Database name {0:?} cannot be used as a file name")]
    UnsafeDatabaseName(String),
    #[error("Listing databases failed: {0}")]
    CatalogQuery(ProcessFailure),
    #[error("Dump of {request} failed: {cause}")]
    Dump {
        request: DumpRequest,
        cause: ProcessFailure,
    },
    #[error("Another backup run holds the lock {0:?}")]
    Locked(PathBuf),
    #[error("{}:\n{}", msg, indent::indent_all_with("  ", error.to_string()))]
    WithMsg { msg: String, error: Box<Error> },
    #[error("{}", itertools::join(.0, "\n\n"))]
    LotsOfError(Vec<Error>),
}

impl<S: Into<String>> WithMsg<S> for Error {
    fn with_msg(self, msg: S) -> Self {
        Self::WithMsg {
            msg: msg.into(),
            error: Box::new(self),
        }
    }
}

impl From<Vec<Error>> for Error {
    fn from(errors: Vec<Error>) -> Self {
        if errors.is_empty() {
            panic!("Should not create lots of errors when error is empty")
        }
        Self::LotsOfError(errors.into_iter().flat_map(Error::into_iter).collect_vec())
    }
}

impl Error {
    pub fn into_iter(self) -> Box<dyn Iterator<Item = Error>> {
        match self {
            Error::LotsOfError(v) => Box::new(v.into_iter().flat_map(Error::into_iter)),
            e => Box::new(std::iter::once(e)),
        }
    }

    /// Innermost error once every `WithMsg` layer is peeled off.
    pub fn root(&self) -> &Error {
        match self {
            Error::WithMsg { error, .. } => error.root(),
            e => e,
        }
    }
}
