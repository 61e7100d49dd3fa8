use crate::backup::backup_config::Configuration;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::debug;

/// Why an external PostgreSQL client program did not deliver its output.
#[derive(Error, Debug)]
pub enum ProcessFailure {
    #[error("could not start {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        source: io::Error,
    },
    #[error("{program:?} exited with {status}")]
    Exit { program: PathBuf, status: ExitStatus },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Builds a client command carrying the connection parameters of `config`.
///
/// The password never appears on the command line, it is handed over through `PGPASSWORD`.
pub fn pg_command(program: &Path, config: &Configuration) -> Command {
    let mut command = Command::new(program);
    command.arg("-h").arg(config.hostname());
    if let Some(port) = config.port() {
        command.arg("-p").arg(port.to_string());
    }
    command.arg("-U").arg(config.username());
    if let Some(password) = config.password() {
        command.env("PGPASSWORD", password.inner());
    }
    command.stdin(Stdio::null()).stderr(Stdio::inherit());
    command
}

pub fn program_of(command: &Command) -> PathBuf {
    PathBuf::from(command.get_program())
}

/// Runs `command` to completion, treating any non-zero exit as failure.
pub fn run_to_completion(command: &mut Command) -> Result<(), ProcessFailure> {
    let program = program_of(command);
    debug!("Running {:?}", command);
    let status = command.status().map_err(|source| ProcessFailure::Spawn {
        program: program.clone(),
        source,
    })?;
    if !status.success() {
        return Err(ProcessFailure::Exit { program, status });
    }
    Ok(())
}
