pub mod backup_config;
pub mod catalog;
pub mod dump;
pub mod file_ext;
pub mod finish;
pub mod identity;
pub mod lock;
pub mod pg_command;
pub mod prune;
pub mod redacted;
pub mod result_error;
pub mod rotation;
pub mod run;
#[cfg(test)]
mod test_support;
pub mod validate;

use crate::backup::backup_config::Configuration;
use crate::backup::catalog::{DatabaseCatalog, PsqlCatalog};
use crate::backup::dump::{Dumper, PgDumpExecutor};
use crate::backup::identity::check_identity;
use crate::backup::lock::BackupLock;
use crate::backup::prune::{GenerationRemover, RemoveDirAll};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::rotation::{expired_generations, scan_backup_dir, select_generation, GenerationLabel};
use crate::backup::run::BackupRun;
use chrono::{DateTime, Local, Utc};
use tracing::{info, warn};

/// One complete invocation against the live server, as of now.
pub fn run_backup(config: &Configuration) -> Result<BackupRun> {
    perform_rotated_backup(
        config,
        Local::now(),
        &PsqlCatalog::new(config),
        &PgDumpExecutor::new(config),
        &RemoveDirAll,
    )
}

/// Checks identity, locks, prunes the expired generations of today's label, then dumps.
///
/// Nothing is written before the identity check passes. Pruning never fails
/// the run; a failed dump does, leaving the run directory as it was.
pub fn perform_rotated_backup<C, D, R>(
    config: &Configuration,
    now: DateTime<Local>,
    catalog: &C,
    dumper: &D,
    remover: &R,
) -> Result<BackupRun>
where
    C: DatabaseCatalog,
    D: Dumper,
    R: GenerationRemover,
{
    check_identity(config.backup_user().as_deref())?;

    let backup_dir = config.backup_dir();
    std::fs::create_dir_all(backup_dir)
        .map_err(Error::from)
        .with_msg(format!("Cannot create backup directory {:?}", backup_dir))?;
    let _lock = if config.lock() {
        Some(BackupLock::acquire(backup_dir)?)
    } else {
        None
    };

    if !config.dumps_databases() {
        warn!("Plain and custom backups are both disabled, only globals can be written");
    }

    let today = now.date_naive();
    let label = select_generation(today, config);
    info!("Starting {label} backup for {today}");
    prune_expired(config, label, now.with_timezone(&Utc), remover);

    let mut run = BackupRun::new(backup_dir, label, today);
    run.execute(config, catalog, dumper)?;
    Ok(run)
}

fn prune_expired<R: GenerationRemover>(
    config: &Configuration,
    label: GenerationLabel,
    now: DateTime<Utc>,
    remover: &R,
) {
    let items = match scan_backup_dir(config.backup_dir()) {
        Ok(items) => items,
        Err(e) => {
            warn!("Skipping retention, cannot list {:?}: {e}", config.backup_dir());
            return;
        }
    };

    let result = prune::prune(expired_generations(&items, label, now, config), remover);
    if let Some(e) = result.into_error() {
        warn!("Some expired backups were not removed:\n{e}");
    }
}
