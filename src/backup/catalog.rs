//! Database discovery and the schema-only / full split.

use crate::backup::backup_config::{split_database_list, Configuration};
use crate::backup::pg_command::{pg_command, program_of, ProcessFailure};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use itertools::Itertools;
use std::collections::HashSet;
use std::process::Stdio;
use tracing::{debug, info, warn};

/// Every database that accepts connections and is not a template, in name order.
static ELIGIBLE_DATABASES_QUERY: &str = "SELECT datname FROM pg_database \
     WHERE datallowconn AND NOT datistemplate ORDER BY datname;";

/// Database the catalog query connects to.
static MAINTENANCE_DATABASE: &str = "postgres";

/// Source of the names of the databases eligible for backup.
pub trait DatabaseCatalog {
    fn eligible_databases(&self) -> Result<Vec<String>>;
}

/// Asks the server through `psql` in unaligned, tuples-only mode.
pub struct PsqlCatalog<'a> {
    config: &'a Configuration,
}

impl<'a> PsqlCatalog<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }
}

impl DatabaseCatalog for PsqlCatalog<'_> {
    fn eligible_databases(&self) -> Result<Vec<String>> {
        let mut command = pg_command(self.config.tools().psql(), self.config);
        command
            .arg("-At")
            .arg("-c")
            .arg(ELIGIBLE_DATABASES_QUERY)
            .arg(MAINTENANCE_DATABASE)
            .stdout(Stdio::piped());
        let program = program_of(&command);
        debug!("Running {:?}", command);

        let output = command.output().map_err(|source| {
            Error::CatalogQuery(ProcessFailure::Spawn {
                program: program.clone(),
                source,
            })
        })?;
        if !output.status.success() {
            return Err(Error::CatalogQuery(ProcessFailure::Exit {
                program,
                status: output.status,
            }));
        }

        Ok(parse_database_names(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn parse_database_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// The two disjoint, ascending database sets of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub schema_only: Vec<String>,
    pub full: Vec<String>,
}

/// Splits the eligible databases by exact name match against `schema_only_list`.
///
/// A failing catalog query is logged and treated as "no databases", so globals
/// already written stay valid and the run carries on.
pub fn classify<C: DatabaseCatalog>(catalog: &C, schema_only_list: &str) -> Classification {
    let eligible = catalog.eligible_databases().unwrap_or_else(|e| {
        warn!("Could not list databases, continuing with none: {e}");
        Vec::new()
    });

    let schema_only_names: HashSet<&str> = split_database_list(schema_only_list).collect();
    let (schema_only, full): (Vec<String>, Vec<String>) = eligible
        .into_iter()
        .sorted_unstable()
        .dedup()
        .partition(|name| schema_only_names.contains(name.as_str()));

    let classification = Classification { schema_only, full };
    info!(
        "Found {} schema-only and {} full databases",
        classification.schema_only.len(),
        classification.full.len()
    );
    classification
}
