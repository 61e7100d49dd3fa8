use crate::backup::backup_config::Configuration;
use crate::backup::result_error::result::Result;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use derive_more::Display;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

static DATE_FORMAT: &str = "%Y-%m-%d";

/// Rotation category of a run directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum GenerationLabel {
    #[display("daily")]
    Daily,
    #[display("weekly")]
    Weekly,
}

impl GenerationLabel {
    /// Directory name suffix, e.g. `-daily`.
    pub fn suffix(&self) -> &'static str {
        match self {
            GenerationLabel::Daily => "-daily",
            GenerationLabel::Weekly => "-weekly",
        }
    }

    /// Age in whole days beyond which a generation of this label is expired.
    pub fn retention_days(&self, config: &Configuration) -> i64 {
        match self {
            GenerationLabel::Daily => i64::from(config.days_to_keep()),
            GenerationLabel::Weekly => i64::from(config.weeks_to_keep()) * 7,
        }
    }
}

/// Weekly on the configured weekday (Monday = 1), daily on every other day.
pub fn select_generation(today: NaiveDate, config: &Configuration) -> GenerationLabel {
    if today.weekday().number_from_monday() == config.day_of_week_to_keep() {
        GenerationLabel::Weekly
    } else {
        GenerationLabel::Daily
    }
}

/// `<YYYY-MM-DD>-<label>`
pub fn generation_dir_name(date: NaiveDate, label: GenerationLabel) -> String {
    format!("{}{}", date.format(DATE_FORMAT), label.suffix())
}

/// A direct child of the backup directory with its modification time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemWithDateTime<R> {
    pub item: R,
    pub date_time: DateTime<Utc>,
    pub is_dir: bool,
}

/// Lists the direct children of `backup_dir`; a missing directory has none.
pub fn scan_backup_dir(backup_dir: &Path) -> Result<Vec<ItemWithDateTime<PathBuf>>> {
    let entries = match read_dir(backup_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut items = Vec::new();
    for entry in entries {
        let entry = entry?;
        let metadata = entry.metadata()?;
        items.push(ItemWithDateTime {
            item: entry.path(),
            date_time: DateTime::<Utc>::from(metadata.modified()?),
            is_dir: metadata.is_dir(),
        });
    }
    Ok(items)
}

/// Directories carrying `label`'s suffix last modified more than its retention ago.
///
/// With 14 days of retention a directory written 14 days and one minute ago
/// is expired, one written exactly 14 days ago is kept.
pub fn expired_generations<'a, I>(
    items: I,
    label: GenerationLabel,
    now: DateTime<Utc>,
    config: &Configuration,
) -> impl Iterator<Item = &'a Path>
where
    I: IntoIterator<Item = &'a ItemWithDateTime<PathBuf>>,
{
    let retention = Duration::days(label.retention_days(config));
    items
        .into_iter()
        .filter(|item| item.is_dir)
        .filter(move |item| {
            item.item
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(label.suffix()))
        })
        .filter(move |item| now.signed_duration_since(item.date_time) > retention)
        .map(|item| item.item.as_path())
}
