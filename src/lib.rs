//! # pg_backup_rotated
//!
//! Rotated PostgreSQL backups driven by `pg_dump` and `pg_dumpall`.
//!
//! ## Features
//!
//! - **Globals**: roles and tablespaces through `pg_dumpall -g`
//! - **Schema-only databases**: structure without data for the databases listed in `schema_only_list`
//! - **Formats**: gzipped plain SQL and the `pg_dump` custom archive, independently enabled
//! - **Atomic artifacts**: dumps are written as `.in_progress` and renamed only once complete
//! - **Rotation**: one weekly generation on the configured weekday, daily ones otherwise, each with its own expiry
//!
//! ## Quick Start
//!
//! ```no_run
//! use pg_backup_rotated::backup::backup_config::{Configuration, Overrides};
//!
//! let config = Configuration::load("pg_backup.yml", Overrides::default())?;
//! let run = pg_backup_rotated::backup::run_backup(&config)?;
//! println!("Wrote {} artifacts into {:?}", run.artifacts().len(), run.dir());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
