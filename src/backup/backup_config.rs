use crate::backup::redacted::RedactedString;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::validate::{validate_schema_only_list, validate_writable_dir};
use bon::Builder;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fs::File;
use std::path::{Path, PathBuf};
use validator::Validate;

pub static CONFIG_FILE_NAME: &str = "pg_backup.yml";
static SYSTEM_CONFIG_DIR: &str = "/etc/pg_backup";

/// Resolved settings for one backup invocation.
///
/// Built once (from YAML or the builder), validated, then only ever read.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters, CopyGetters)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// OS user the backup must run as, checked before anything touches disk
    #[builder(into)]
    #[getset(get = "pub")]
    backup_user: Option<String>,
    #[serde(default = "default_hostname")]
    #[builder(default = default_hostname(), into)]
    #[getset(get = "pub")]
    hostname: String,
    #[getset(get_copy = "pub")]
    port: Option<u16>,
    #[serde(default = "default_username")]
    #[builder(default = default_username(), into)]
    #[getset(get = "pub")]
    username: String,
    #[builder(into)]
    #[getset(get = "pub")]
    password: Option<RedactedString>,
    #[validate(custom(function = validate_writable_dir))]
    #[builder(into)]
    #[getset(get = "pub")]
    backup_dir: PathBuf,
    /// Comma separated names of databases backed up without their data
    #[serde(default)]
    #[validate(custom(function = validate_schema_only_list))]
    #[builder(default, into)]
    #[getset(get = "pub")]
    schema_only_list: String,
    #[serde(default = "default_true")]
    #[builder(default = true)]
    #[getset(get_copy = "pub")]
    enable_plain_backups: bool,
    #[serde(default = "default_true")]
    #[builder(default = true)]
    #[getset(get_copy = "pub")]
    enable_custom_backups: bool,
    #[serde(default = "default_true")]
    #[builder(default = true)]
    #[getset(get_copy = "pub")]
    enable_globals_backups: bool,
    /// Weekday (Monday = 1 .. Sunday = 7) whose run is kept as a weekly generation
    #[serde(default = "default_day_of_week_to_keep")]
    #[validate(range(min = 1, max = 7))]
    #[builder(default = default_day_of_week_to_keep())]
    #[getset(get_copy = "pub")]
    day_of_week_to_keep: u32,
    #[serde(default = "default_days_to_keep")]
    #[builder(default = default_days_to_keep())]
    #[getset(get_copy = "pub")]
    days_to_keep: u32,
    #[serde(default = "default_weeks_to_keep")]
    #[builder(default = default_weeks_to_keep())]
    #[getset(get_copy = "pub")]
    weeks_to_keep: u32,
    /// Hold an exclusive lock on the backup directory for the whole run
    #[serde(default = "default_true")]
    #[builder(default = true)]
    #[getset(get_copy = "pub")]
    lock: bool,
    #[serde(default)]
    #[builder(default)]
    #[getset(get = "pub")]
    tools: ToolPaths,
}

/// Locations of the PostgreSQL client programs, resolved through `PATH` by default.
#[derive(Clone, Debug, Serialize, Deserialize, Builder, Getters, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct ToolPaths {
    #[serde(default = "default_psql")]
    #[builder(default = default_psql(), into)]
    psql: PathBuf,
    #[serde(default = "default_pg_dump")]
    #[builder(default = default_pg_dump(), into)]
    pg_dump: PathBuf,
    #[serde(default = "default_pg_dumpall")]
    #[builder(default = default_pg_dumpall(), into)]
    pg_dumpall: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        ToolPaths::builder().build()
    }
}

fn default_hostname() -> String {
    "localhost".into()
}

fn default_username() -> String {
    "postgres".into()
}

fn default_true() -> bool {
    true
}

fn default_day_of_week_to_keep() -> u32 {
    5
}

fn default_days_to_keep() -> u32 {
    7
}

fn default_weeks_to_keep() -> u32 {
    5
}

fn default_psql() -> PathBuf {
    "psql".into()
}

fn default_pg_dump() -> PathBuf {
    "pg_dump".into()
}

fn default_pg_dumpall() -> PathBuf {
    "pg_dumpall".into()
}

/// Splits a comma separated database list, ignoring surrounding blanks and empty items.
pub fn split_database_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|name| !name.is_empty())
}

/// Command line values that take precedence over the configuration file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub backup_dir: Option<PathBuf>,
}

impl Configuration {
    /// Reads, overrides and validates the YAML configuration at `path`.
    pub fn load<P: AsRef<Path>>(path: P, overrides: Overrides) -> Result<Self> {
        let path = path.as_ref();
        let config = File::open(path)
            .map_err(Error::from)
            .with_msg(format!("Cannot read config file {:?}", path))
            .and_then(|f| {
                serde_yml::from_reader::<_, Configuration>(f)
                    .map_err(Error::from)
                    .with_msg(format!("Parse YAML config failed: {:?}", path))
            })?
            .with_overrides(overrides);

        config
            .validate()
            .map_err(Error::from)
            .with_msg(format!("Config validation failed: {:?}", path))?;
        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(hostname) = overrides.hostname {
            self.hostname = hostname;
        }
        if let Some(username) = overrides.username {
            self.username = username;
        }
        if let Some(backup_dir) = overrides.backup_dir {
            self.backup_dir = backup_dir;
        }
        self
    }

    /// Whether any per-database artifact can be produced at all.
    pub fn dumps_databases(&self) -> bool {
        self.enable_plain_backups || self.enable_custom_backups
    }
}

/// Candidate configuration files, in the order they are tried.
pub fn default_config_locations() -> Vec<PathBuf> {
    let mut locations = Vec::with_capacity(3);
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        locations.push(exe_dir.join(CONFIG_FILE_NAME));
    }
    if let Ok(cwd) = std::env::current_dir() {
        locations.push(cwd.join(CONFIG_FILE_NAME));
    }
    locations.push(Path::new(SYSTEM_CONFIG_DIR).join(CONFIG_FILE_NAME));
    locations
}

/// Picks the explicit path when given, otherwise the first existing candidate.
pub fn locate_config(explicit: Option<&Path>, candidates: &[PathBuf]) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => candidates
            .iter()
            .find(|candidate| candidate.is_file())
            .cloned()
            .ok_or_else(|| Error::ConfigNotFound {
                searched: candidates.to_vec(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_applies_defaults() {
        let tmp = TempDir::new().unwrap();
        let backup_dir = tmp.path().join("backups");
        let path = write_config(
            tmp.path(),
            &format!("backup_dir: {:?}\n", backup_dir.display().to_string()),
        );

        let config = Configuration::load(&path, Overrides::default()).unwrap();
        assert_eq!(config.hostname(), "localhost");
        assert_eq!(config.username(), "postgres");
        assert_eq!(config.day_of_week_to_keep(), 5);
        assert_eq!(config.days_to_keep(), 7);
        assert_eq!(config.weeks_to_keep(), 5);
        assert!(config.enable_plain_backups());
        assert!(config.enable_custom_backups());
        assert!(config.enable_globals_backups());
        assert!(config.lock());
        assert_eq!(config.tools(), &ToolPaths::default());
        assert!(!backup_dir.exists());
    }

    #[test]
    fn test_load_full_file() {
        let tmp = TempDir::new().unwrap();
        let body = format!(
            r#"
backup_user: postgres
hostname: db.internal
port: 5433
username: backup
password: "not so secret"
backup_dir: {:?}
schema_only_list: "reporting, audit"
enable_plain_backups: true
enable_custom_backups: false
enable_globals_backups: false
day_of_week_to_keep: 7
days_to_keep: 14
weeks_to_keep: 4
lock: false
tools:
  pg_dump: /usr/lib/postgresql/16/bin/pg_dump
"#,
            tmp.path().display().to_string()
        );
        let path = write_config(tmp.path(), &body);

        let config = Configuration::load(&path, Overrides::default()).unwrap();
        assert_eq!(config.backup_user().as_deref(), Some("postgres"));
        assert_eq!(config.hostname(), "db.internal");
        assert_eq!(config.port(), Some(5433));
        assert_eq!(config.password().as_ref().unwrap().inner(), "not so secret");
        assert_eq!(
            split_database_list(config.schema_only_list()).collect::<Vec<_>>(),
            vec!["reporting", "audit"]
        );
        assert!(!config.enable_custom_backups());
        assert_eq!(config.day_of_week_to_keep(), 7);
        assert_eq!(config.days_to_keep(), 14);
        assert_eq!(config.weeks_to_keep(), 4);
        assert!(!config.lock());
        assert_eq!(
            config.tools().pg_dump(),
            Path::new("/usr/lib/postgresql/16/bin/pg_dump")
        );
        assert_eq!(config.tools().psql(), Path::new("psql"));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            &format!(
                "hostname: from-file\nbackup_dir: {:?}\n",
                tmp.path().join("file").display().to_string()
            ),
        );
        let override_dir = tmp.path().join("override");

        let config = Configuration::load(
            &path,
            Overrides {
                hostname: Some("from-cli".into()),
                username: None,
                backup_dir: Some(override_dir.clone()),
            },
        )
        .unwrap();
        assert_eq!(config.hostname(), "from-cli");
        assert_eq!(config.backup_dir(), &override_dir);
        assert!(!override_dir.exists());
    }

    #[test]
    fn test_invalid_weekday_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            &format!(
                "backup_dir: {:?}\nday_of_week_to_keep: 8\n",
                tmp.path().display().to_string()
            ),
        );

        let err = Configuration::load(&path, Overrides::default()).unwrap_err();
        assert!(matches!(err.root(), Error::ValidationError(_)));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            &format!(
                "backup_dir: {:?}\nmonthly_to_keep: 3\n",
                tmp.path().display().to_string()
            ),
        );

        let err = Configuration::load(&path, Overrides::default()).unwrap_err();
        assert!(matches!(err.root(), Error::SerdeYml(_)));
    }

    #[test]
    fn test_unreadable_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let err =
            Configuration::load(tmp.path().join("missing.yml"), Overrides::default()).unwrap_err();
        assert!(matches!(err.root(), Error::Io(_)));
    }

    #[test]
    fn test_serialized_config_hides_password() {
        let config = Configuration::builder()
            .backup_dir("/var/backups/pg")
            .password(RedactedString::from("hunter22"))
            .build();
        let yaml = serde_yml::to_string(&config).unwrap();
        assert!(!yaml.contains("hunter22"));
        assert!(!yaml.contains("backup_user"));
    }

    #[test]
    fn test_dumps_databases() {
        let both_off = Configuration::builder()
            .backup_dir("/var/backups/pg")
            .enable_plain_backups(false)
            .enable_custom_backups(false)
            .build();
        assert!(!both_off.dumps_databases());

        let custom_only = Configuration::builder()
            .backup_dir("/var/backups/pg")
            .enable_plain_backups(false)
            .build();
        assert!(custom_only.dumps_databases());
    }

    #[test]
    fn test_split_database_list() {
        assert_eq!(split_database_list("").count(), 0);
        assert_eq!(split_database_list(" , ,").count(), 0);
        assert_eq!(
            split_database_list("a,b ,c").collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_locate_config_search_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let candidates = vec![
            first.path().join(CONFIG_FILE_NAME),
            second.path().join(CONFIG_FILE_NAME),
        ];

        let err = locate_config(None, &candidates).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { ref searched } if searched.len() == 2));

        write_config(second.path(), "");
        assert_eq!(locate_config(None, &candidates).unwrap(), candidates[1]);

        write_config(first.path(), "");
        assert_eq!(locate_config(None, &candidates).unwrap(), candidates[0]);

        let explicit = Path::new("/somewhere/else.yml");
        assert_eq!(
            locate_config(Some(explicit), &candidates).unwrap(),
            explicit
        );
    }
}
