use crate::backup::backup_config::Configuration;
use crate::backup::catalog::{classify, DatabaseCatalog};
use crate::backup::dump::{Artifact, DumpFormat, DumpMode, DumpRequest, Dumper};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::rotation::{generation_dir_name, GenerationLabel};
use chrono::NaiveDate;
use derive_more::Display;
use getset::{CopyGetters, Getters};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Progress of a run; only moves forward, `Aborted` is reachable from any non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum RunState {
    Start,
    DirectoryCreated,
    GlobalsDone,
    SchemaOnlyDone,
    FullDone,
    Complete,
    Aborted,
}

/// One invocation writing into `<backup_dir>/<YYYY-MM-DD>-<label>`.
#[derive(Debug, Getters, CopyGetters)]
pub struct BackupRun {
    #[getset(get_copy = "pub")]
    label: GenerationLabel,
    #[getset(get_copy = "pub")]
    date: NaiveDate,
    #[getset(get = "pub")]
    dir: PathBuf,
    #[getset(get = "pub")]
    artifacts: Vec<Artifact>,
    #[getset(get_copy = "pub")]
    state: RunState,
}

impl BackupRun {
    pub fn new(backup_dir: &Path, label: GenerationLabel, date: NaiveDate) -> Self {
        Self {
            label,
            date,
            dir: backup_dir.join(generation_dir_name(date, label)),
            artifacts: Vec::new(),
            state: RunState::Start,
        }
    }

    /// Globals, then schema-only databases, then full databases, stopping at the first failure.
    ///
    /// Artifacts finished before a failure stay on disk and in [`Self::artifacts`].
    pub fn execute<C, D>(&mut self, config: &Configuration, catalog: &C, dumper: &D) -> Result<()>
    where
        C: DatabaseCatalog,
        D: Dumper,
    {
        let res = self.execute_steps(config, catalog, dumper);
        match &res {
            Ok(()) => {
                self.state = RunState::Complete;
                info!(
                    "Backup {:?} complete with {} artifacts",
                    self.dir,
                    self.artifacts.len()
                );
            }
            Err(_) => {
                warn!("Backup {:?} aborted after {}", self.dir, self.state);
                self.state = RunState::Aborted;
            }
        }
        res
    }

    fn execute_steps<C, D>(&mut self, config: &Configuration, catalog: &C, dumper: &D) -> Result<()>
    where
        C: DatabaseCatalog,
        D: Dumper,
    {
        std::fs::create_dir_all(&self.dir)
            .map_err(Error::from)
            .with_msg(format!("Cannot create backup directory {:?}", self.dir))?;
        self.state = RunState::DirectoryCreated;
        info!("Writing {} backup into {:?}", self.label, self.dir);

        if config.enable_globals_backups() {
            self.dump(dumper, DumpRequest::globals())?;
            self.state = RunState::GlobalsDone;
        }

        let classification = classify(catalog, config.schema_only_list());
        for name in &classification.schema_only {
            self.dump_database(config, dumper, name, DumpMode::SchemaOnly)?;
        }
        self.state = RunState::SchemaOnlyDone;

        for name in &classification.full {
            self.dump_database(config, dumper, name, DumpMode::Full)?;
        }
        self.state = RunState::FullDone;
        Ok(())
    }

    fn dump_database<D: Dumper>(
        &mut self,
        config: &Configuration,
        dumper: &D,
        name: &str,
        mode: DumpMode,
    ) -> Result<()> {
        if config.enable_plain_backups() {
            self.dump(dumper, DumpRequest::for_database(name, mode, DumpFormat::Plain))?;
        }
        if config.enable_custom_backups() {
            self.dump(dumper, DumpRequest::for_database(name, mode, DumpFormat::Custom))?;
        }
        Ok(())
    }

    fn dump<D: Dumper>(&mut self, dumper: &D, request: DumpRequest) -> Result<()> {
        let artifact = dumper.dump(&self.dir, &request)?;
        self.artifacts.push(artifact);
        Ok(())
    }
}
