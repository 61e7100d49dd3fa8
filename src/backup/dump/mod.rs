pub mod plain;

use crate::backup::backup_config::Configuration;
use crate::backup::file_ext::FileExtProvider;
use crate::backup::pg_command::{pg_command, run_to_completion, ProcessFailure};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::validate::validate_database_file_name;
use derive_more::Display;
use getset::{CopyGetters, Getters};
use std::fmt::Formatter;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Suffix of a dump still being written; only complete dumps lose it.
pub static IN_PROGRESS_SUFFIX: &str = ".in_progress";
static GLOBALS_FILE_STEM: &str = "globals";
static SCHEMA_FILE_SUFFIX: &str = "_schema";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum DumpMode {
    /// Roles and tablespaces of the whole server
    #[display("globals")]
    Globals,
    #[display("schema-only")]
    SchemaOnly,
    #[display("full")]
    Full,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum DumpFormat {
    /// SQL script, gzipped on the way to disk
    #[display("plain")]
    Plain,
    /// `pg_dump` native archive, written by `pg_dump` itself
    #[display("custom")]
    Custom,
}

impl FileExtProvider for DumpFormat {
    fn file_ext(&self) -> &'static str {
        match self {
            DumpFormat::Plain => "sql.gz",
            DumpFormat::Custom => "custom",
        }
    }
}

impl DumpFormat {
    fn pg_dump_flag(&self) -> &'static str {
        match self {
            DumpFormat::Plain => "-Fp",
            DumpFormat::Custom => "-Fc",
        }
    }
}

/// What to dump: the server globals, or one database in a given mode and format.
#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters)]
pub struct DumpRequest {
    #[getset(get = "pub")]
    database: Option<String>,
    #[getset(get_copy = "pub")]
    mode: DumpMode,
    #[getset(get_copy = "pub")]
    format: DumpFormat,
}

impl DumpRequest {
    /// Globals only ever exist as a plain dump.
    pub fn globals() -> Self {
        Self {
            database: None,
            mode: DumpMode::Globals,
            format: DumpFormat::Plain,
        }
    }

    pub fn for_database<S: Into<String>>(name: S, mode: DumpMode, format: DumpFormat) -> Self {
        Self {
            database: Some(name.into()),
            mode,
            format,
        }
    }

    /// Final artifact name, e.g. `globals.sql.gz`, `app_schema.custom` or `app.sql.gz`.
    pub fn file_name(&self) -> Result<String> {
        let stem = match (&self.database, self.mode) {
            (None, DumpMode::Globals) => GLOBALS_FILE_STEM.to_owned(),
            (Some(name), DumpMode::SchemaOnly | DumpMode::Full) => {
                validate_database_file_name(name)
                    .map_err(|_| Error::UnsafeDatabaseName(name.clone()))?;
                match self.mode {
                    DumpMode::SchemaOnly => format!("{name}{SCHEMA_FILE_SUFFIX}"),
                    _ => name.clone(),
                }
            }
            _ => {
                return Err(Error::Io(std::io::Error::other(format!(
                    "{self} does not name a dumpable target"
                ))))
            }
        };
        Ok(format!("{stem}.{}", self.format.file_ext()))
    }
}

impl std::fmt::Display for DumpRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.database {
            None => write!(f, "{} ({})", self.mode, self.format),
            Some(name) => write!(f, "database {name:?} ({}, {})", self.mode, self.format),
        }
    }
}

/// One finished output file, complete under its final name.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct Artifact {
    request: DumpRequest,
    path: PathBuf,
}

impl Artifact {
    pub(crate) fn new(request: DumpRequest, path: PathBuf) -> Self {
        Self { request, path }
    }
}

pub fn in_progress_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_owned();
    name.push(IN_PROGRESS_SUFFIX);
    PathBuf::from(name)
}

/// Produces artifacts inside a run directory.
pub trait Dumper {
    fn dump(&self, target_dir: &Path, request: &DumpRequest) -> Result<Artifact>;
}

/// Dumps through `pg_dumpall` / `pg_dump`, renaming into place only on success.
pub struct PgDumpExecutor<'a> {
    config: &'a Configuration,
}

impl<'a> PgDumpExecutor<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    fn command(&self, request: &DumpRequest) -> Command {
        let tools = self.config.tools();
        match &request.database {
            None => {
                let mut command = pg_command(tools.pg_dumpall(), self.config);
                command.arg("-g");
                command
            }
            Some(name) => {
                let mut command = pg_command(tools.pg_dump(), self.config);
                command.arg(request.format.pg_dump_flag());
                if request.mode == DumpMode::SchemaOnly {
                    command.arg("-s");
                }
                command.arg(name);
                command
            }
        }
    }

    fn write(&self, request: &DumpRequest, tmp_path: &Path) -> std::result::Result<(), ProcessFailure> {
        let mut command = self.command(request);
        match request.format {
            DumpFormat::Plain => plain::dump_gzipped(&mut command, tmp_path),
            DumpFormat::Custom => {
                command.arg("-f").arg(tmp_path);
                run_to_completion(&mut command)
            }
        }
    }
}

impl Dumper for PgDumpExecutor<'_> {
    fn dump(&self, target_dir: &Path, request: &DumpRequest) -> Result<Artifact> {
        let final_path = target_dir.join(request.file_name()?);
        let tmp_path = in_progress_path(&final_path);
        info!("Dumping {request} to {:?}", final_path);

        self.write(request, &tmp_path)
            .and_then(|_| std::fs::rename(&tmp_path, &final_path).map_err(ProcessFailure::from))
            .map_err(|cause| Error::Dump {
                request: request.clone(),
                cause,
            })?;

        info!("Finished {:?}", final_path);
        Ok(Artifact::new(request.clone(), final_path))
    }
}
