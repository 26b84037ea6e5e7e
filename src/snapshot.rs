//! Snapshot persistence.
//!
//! A run's records land in three CSV artifacts under the output folder, all
//! with the column order of [`CanonicalRecord`]:
//!
//! | File | Behaviour |
//! |------|-----------|
//! | `confluence_data_current.csv` | overwritten every run |
//! | `confluence_data_<YYYY-Wnn>.csv` | copy of current; last run in a week wins |
//! | `confluence_data_history.csv` | append-only; header written once |
//!
//! Evicted weekly files go to `archived_snapshots/` (see [`crate::retention`]).
//! The writes are not transactional with respect to each other; a failed
//! run is repaired by running again.

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::OutputConfig;
use crate::models::CanonicalRecord;

pub const FILE_PREFIX: &str = "confluence_data_";
pub const CURRENT_FILE: &str = "confluence_data_current.csv";
pub const HISTORY_FILE: &str = "confluence_data_history.csv";
pub const ARCHIVE_DIR: &str = "archived_snapshots";

/// ISO-8601 week. Displays as `YYYY-Wnn`; the zero padding makes the
/// lexicographic order of file names chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekId {
    pub year: i32,
    pub week: u32,
}

impl WeekId {
    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    /// The ISO week (and ISO year) containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn monday(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
    }

    pub fn snapshot_file_name(&self) -> String {
        format!("{}{}.csv", FILE_PREFIX, self)
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (year, week) = s
            .split_once("-W")
            .with_context(|| format!("invalid week '{}', expected YYYY-Wnn", s))?;
        if year.len() != 4 || week.len() != 2 {
            bail!("invalid week '{}', expected YYYY-Wnn", s);
        }
        let id = WeekId {
            year: year
                .parse()
                .with_context(|| format!("invalid year in week '{}'", s))?,
            week: week
                .parse()
                .with_context(|| format!("invalid week number in '{}'", s))?,
        };
        if id.monday().is_none() {
            bail!("week '{}' does not exist in the ISO calendar", s);
        }
        Ok(id)
    }
}

/// A week id with its Monday..Sunday span, for reporting.
#[derive(Debug, Clone)]
pub struct WeekInfo {
    pub id: WeekId,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekInfo {
    pub fn for_week(id: WeekId) -> Result<Self> {
        let start = id
            .monday()
            .with_context(|| format!("week {} does not exist", id))?;
        Ok(Self {
            id,
            start,
            end: start + Duration::days(6),
        })
    }
}

/// What a [`SnapshotStore::persist`] call wrote.
#[derive(Debug, Clone, Default)]
pub struct PersistOutcome {
    pub records: usize,
    pub current: Option<PathBuf>,
    pub weekly: Option<PathBuf>,
    pub history: Option<PathBuf>,
}

/// Writes record batches to the current, weekly and history artifacts.
pub struct SnapshotStore {
    root: PathBuf,
    keep_history: bool,
}

impl SnapshotStore {
    pub fn new(output: &OutputConfig) -> Self {
        Self {
            root: output.folder.clone(),
            keep_history: output.keep_history,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current_path(&self) -> PathBuf {
        self.root.join(CURRENT_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.root.join(HISTORY_FILE)
    }

    pub fn weekly_path(&self, week: WeekId) -> PathBuf {
        self.root.join(week.snapshot_file_name())
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join(ARCHIVE_DIR)
    }

    /// Create the output and archive folders if missing.
    pub fn ensure_folders(&self) -> Result<()> {
        for dir in [self.root.clone(), self.archive_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create folder: {}", dir.display()))?;
                tracing::info!(folder = %dir.display(), "created output folder");
            }
        }
        Ok(())
    }

    /// Persist `records` for `week`. An empty batch writes nothing.
    pub fn persist(&self, records: &[CanonicalRecord], week: WeekId) -> Result<PersistOutcome> {
        if records.is_empty() {
            tracing::info!("no data to write; skipping snapshot");
            return Ok(PersistOutcome::default());
        }

        self.ensure_folders()?;
        let mut outcome = PersistOutcome {
            records: records.len(),
            ..Default::default()
        };

        let current = self.current_path();
        write_csv(&current, records)?;
        tracing::info!(path = %current.display(), records = records.len(), "wrote current snapshot");
        outcome.current = Some(current.clone());

        if !self.keep_history {
            return Ok(outcome);
        }

        let weekly = self.weekly_path(week);
        std::fs::copy(&current, &weekly).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                current.display(),
                weekly.display()
            )
        })?;
        tracing::info!(path = %weekly.display(), "saved weekly snapshot");
        outcome.weekly = Some(weekly);

        let history = self.history_path();
        append_csv(&history, records)?;
        tracing::info!(path = %history.display(), "appended to history");
        outcome.history = Some(history);

        Ok(outcome)
    }
}

fn csv_writer_builder(has_headers: bool) -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder
        .has_headers(has_headers)
        .terminator(csv::Terminator::CRLF);
    builder
}

fn write_csv(path: &Path, records: &[CanonicalRecord]) -> Result<()> {
    let mut writer = csv_writer_builder(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn append_csv(path: &Path, records: &[CanonicalRecord]) -> Result<()> {
    let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut writer = csv_writer_builder(is_new).from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Number of data rows in a CSV artifact (header excluded).
pub fn count_rows(path: &Path) -> Result<usize> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows = 0;
    for record in reader.records() {
        record?;
        rows += 1;
    }
    Ok(rows)
}
