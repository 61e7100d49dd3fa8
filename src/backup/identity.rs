use crate::backup::pg_command::{program_of, ProcessFailure};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use std::process::{Command, Stdio};
use tracing::debug;

/// Name of the effective user, as reported by `id -un`.
pub fn current_user() -> Result<String> {
    let mut command = Command::new("id");
    command.arg("-un").stdin(Stdio::null()).stderr(Stdio::inherit());
    let program = program_of(&command);

    let output = command.output().map_err(|source| {
        Error::Io(source).with_msg(format!("Could not start {:?}", program))
    })?;
    if !output.status.success() {
        let failure = ProcessFailure::Exit {
            program,
            status: output.status,
        };
        return Err(Error::Io(std::io::Error::other(failure)).with_msg("Cannot determine current user"));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

/// Fails with [`Error::Permission`] unless the process runs as `required`.
pub fn check_identity(required: Option<&str>) -> Result<()> {
    let Some(required) = required else {
        return Ok(());
    };

    let actual = current_user()?;
    if actual != required {
        return Err(Error::Permission {
            required: required.to_owned(),
            actual,
        });
    }
    debug!("Running as required user {:?}", required);
    Ok(())
}
