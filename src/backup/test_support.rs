//! Stand-ins for the PostgreSQL server and client programs used by the unit tests.

use crate::backup::catalog::DatabaseCatalog;
use crate::backup::pg_command::ProcessFailure;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use std::cell::Cell;
use std::path::{Path, PathBuf};

/// In-memory catalog that remembers whether it was asked.
pub struct FakeCatalog {
    names: Option<Vec<String>>,
    queried: Cell<bool>,
}

impl FakeCatalog {
    pub fn with(names: &[&str]) -> Self {
        Self {
            names: Some(names.iter().map(|s| s.to_string()).collect()),
            queried: Cell::new(false),
        }
    }

    pub fn failing() -> Self {
        Self {
            names: None,
            queried: Cell::new(false),
        }
    }

    pub fn queried(&self) -> bool {
        self.queried.get()
    }
}

impl DatabaseCatalog for FakeCatalog {
    fn eligible_databases(&self) -> Result<Vec<String>> {
        self.queried.set(true);
        self.names.clone().ok_or_else(|| {
            Error::CatalogQuery(ProcessFailure::Io(std::io::Error::other(
                "connection refused",
            )))
        })
    }
}

/// Writes an executable `/bin/sh` script named `name` into `dir`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A `pg_dump` / `pg_dumpall` look-alike.
///
/// Every invocation appends its arguments to `log`. Output goes to the file
/// following `-f` when present, otherwise to stdout. Invocations whose
/// argument line matches the shell pattern `fail_when` print partial output
/// and exit with status 1. The pattern lands unquoted in a `case` arm, so it
/// must not contain blanks; use `*` between words.
#[cfg(unix)]
pub fn fake_pg_tool(dir: &Path, name: &str, log: &Path, fail_when: &str) -> PathBuf {
    let body = format!(
        r#"echo "$*" >> '{log}'
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-f" ]; then out="$arg"; fi
  prev="$arg"
done
case "$*" in
  {fail_when})
    if [ -n "$out" ]; then echo partial > "$out"; else echo "-- partial"; fi
    exit 1
    ;;
esac
if [ -n "$out" ]; then
  echo "custom archive: $*" > "$out"
else
  echo "-- plain dump: $*"
fi
"#,
        log = log.display(),
    );
    write_script(dir, name, &body)
}

/// Pattern for `fake_pg_tool` that never matches.
pub static NEVER_FAIL: &str = "__never__";

pub fn read_log(log: &Path) -> Vec<String> {
    std::fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_owned)
        .collect()
}
