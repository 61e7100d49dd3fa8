use crate::backup::finish::Finish;
use crate::backup::pg_command::{program_of, ProcessFailure};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Streams the stdout of `command` through gzip into `out`.
///
/// `out` is created before the program starts and is left behind whatever
/// happens; the caller decides whether it becomes an artifact.
pub fn dump_gzipped(command: &mut Command, out: &Path) -> Result<(), ProcessFailure> {
    let file = File::create(out)?;
    let program = program_of(command);
    debug!("Running {:?} into {:?}", command, out);

    let mut child = command
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|source| ProcessFailure::Spawn {
            program: program.clone(),
            source,
        })?;

    let compressed = match child.stdout.take() {
        Some(stdout) => compress_into(stdout, file),
        None => Ok(()),
    };
    let status = child.wait()?;
    if !status.success() {
        return Err(ProcessFailure::Exit { program, status });
    }

    compressed.map_err(ProcessFailure::from)
}

fn compress_into<R: Read>(mut reader: R, file: File) -> io::Result<()> {
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish().and_then(Finish::finish)?.sync_all()
}
