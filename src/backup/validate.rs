//! Validation functions for configuration values.
//!
//! Provides custom validation functions for the backup directory,
//! the schema-only database list and database names used as file names.

use sanitize_filename::{is_sanitized, sanitize};
use validator::ValidationError;

use std::path::Path;

use crate::backup::backup_config::split_database_list;

pub fn validate_database_file_name<S: AsRef<str>>(name: S) -> Result<(), ValidationError> {
    let name = name.as_ref();
    if name.is_empty() || !is_sanitized(name) {
        return Err(ValidationError::new("InvalidDatabaseName").with_message(
            format!(
                "{name:?} is not usable as a file name, a safe form would be {:?}",
                sanitize(name)
            )
            .into(),
        ));
    }

    Ok(())
}

pub fn validate_schema_only_list<S: AsRef<str>>(list: S) -> Result<(), ValidationError> {
    split_database_list(list.as_ref()).try_for_each(validate_database_file_name)
}

fn invalid_dir(message: String) -> ValidationError {
    ValidationError::new("InvalidDirectory").with_message(message.into())
}

fn validate_writable(dir: &Path) -> Result<(), ValidationError> {
    let md = std::fs::metadata(dir)
        .map_err(|e| invalid_dir(format!("cannot access metadata for {:?}: {}", dir, e)))?;
    if !md.is_dir() {
        return Err(invalid_dir(format!("{:?} is not a directory", dir)));
    }
    if md.permissions().readonly() {
        return Err(invalid_dir(format!("cannot write to dir {:?}", dir)));
    }
    Ok(())
}

/// Accepts a writable directory, or a missing one whose nearest existing
/// ancestor is a writable directory. Nothing is created here.
pub fn validate_writable_dir<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    let existing = dir
        .ancestors()
        .map(|ancestor| {
            if ancestor.as_os_str().is_empty() {
                Path::new(".")
            } else {
                ancestor
            }
        })
        .find(|ancestor| ancestor.exists());
    match existing {
        Some(existing) => validate_writable(existing),
        None => Err(invalid_dir(format!("no existing parent for {:?}", dir))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plain_database_names_are_valid() {
        assert!(validate_database_file_name("reporting").is_ok());
        assert!(validate_database_file_name("app-db_2").is_ok());
    }

    #[test]
    fn test_path_unsafe_database_names_are_rejected() {
        assert!(validate_database_file_name("a/b").is_err());
        assert!(validate_database_file_name("..").is_err());
        assert!(validate_database_file_name("x:y").is_err());
        assert!(validate_database_file_name("").is_err());
    }

    #[test]
    fn test_schema_only_list() {
        assert!(validate_schema_only_list("").is_ok());
        assert!(validate_schema_only_list("reporting, audit").is_ok());
        assert!(validate_schema_only_list("reporting,../etc").is_err());
    }

    #[test]
    fn test_existing_dir_is_valid() {
        let tmp = TempDir::new().unwrap();
        assert!(validate_writable_dir(tmp.path()).is_ok());
    }

    #[test]
    fn test_missing_dir_is_valid_but_not_created() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("backups");
        assert!(validate_writable_dir(&dir).is_ok());
        assert!(!dir.exists());
        assert!(!tmp.path().join("nested").exists());
    }

    #[test]
    fn test_missing_relative_dir_is_valid() {
        assert!(validate_writable_dir("missing-relative-backup-dir").is_ok());
        assert!(!Path::new("missing-relative-backup-dir").exists());
    }

    #[test]
    fn test_dir_below_a_file_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain_file");
        std::fs::write(&file, b"x").unwrap();
        assert!(validate_writable_dir(file.join("backups")).is_err());
    }

    #[test]
    fn test_file_is_not_a_dir() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain_file");
        std::fs::write(&file, b"x").unwrap();
        assert!(validate_writable_dir(&file).is_err());
    }
}
