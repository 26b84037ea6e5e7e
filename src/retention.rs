//! Weekly snapshot retention.
//!
//! Weekly files are ordered by name. `YYYY-Wnn` is year-prefixed and zero
//! padded, so name order is chronological order; modification times are
//! never consulted.

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use std::path::{Path, PathBuf};

use crate::config::OutputConfig;
use crate::snapshot::ARCHIVE_DIR;

/// Matches weekly snapshot file names only; `current` and `history` have no
/// `-W` component.
pub const WEEKLY_PATTERN: &str = "confluence_data_*-W*.csv";

/// Moves weekly snapshots beyond the newest `max_keep` into the archive.
pub struct RetentionManager {
    root: PathBuf,
    archive: PathBuf,
    max_keep: usize,
    enabled: bool,
    matcher: GlobMatcher,
}

impl RetentionManager {
    pub fn new(output: &OutputConfig) -> Result<Self> {
        Ok(Self {
            root: output.folder.clone(),
            archive: output.folder.join(ARCHIVE_DIR),
            max_keep: output.max_snapshots_to_keep,
            enabled: output.archive_old_snapshots,
            matcher: Glob::new(WEEKLY_PATTERN)?.compile_matcher(),
        })
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive
    }

    /// Weekly snapshot files in `dir`, sorted ascending by name.
    pub fn weekly_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to list {}", dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if self.matcher.is_match(Path::new(&name)) {
                files.push(entry.path());
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Archive the oldest weekly snapshots over the limit. Returns the new
    /// archive paths, oldest first. No-op when archiving is disabled.
    pub fn prune(&self) -> Result<Vec<PathBuf>> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let files = self.weekly_files(&self.root)?;
        if files.len() <= self.max_keep {
            return Ok(Vec::new());
        }

        std::fs::create_dir_all(&self.archive)
            .with_context(|| format!("Failed to create {}", self.archive.display()))?;

        let excess = files.len() - self.max_keep;
        let mut archived = Vec::with_capacity(excess);
        for file in &files[..excess] {
            let target = match file.file_name() {
                Some(name) => self.archive.join(name),
                None => continue,
            };
            move_file(file, &target)?;
            tracing::info!(
                from = %file.display(),
                to = %target.display(),
                "archived old snapshot"
            );
            archived.push(target);
        }
        Ok(archived)
    }
}

/// Rename, falling back to copy + remove across filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
    std::fs::remove_file(from).with_context(|| format!("Failed to remove {}", from.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn output(tmp: &TempDir, max_keep: usize, enabled: bool) -> OutputConfig {
        OutputConfig {
            folder: tmp.path().to_path_buf(),
            keep_history: true,
            archive_old_snapshots: enabled,
            max_snapshots_to_keep: max_keep,
        }
    }

    fn seed(tmp: &TempDir, weeks: &[&str]) {
        for w in weeks {
            std::fs::write(
                tmp.path().join(format!("confluence_data_{}.csv", w)),
                format!("contents of {}", w),
            )
            .unwrap();
        }
        std::fs::write(tmp.path().join("confluence_data_current.csv"), "cur").unwrap();
        std::fs::write(tmp.path().join("confluence_data_history.csv"), "hist").unwrap();
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn lists_only_weekly_files_in_name_order() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp, &["2026-W10", "2025-W52", "2026-W02"]);
        let manager = RetentionManager::new(&output(&tmp, 12, true)).unwrap();

        let files = manager.weekly_files(tmp.path()).unwrap();

        assert_eq!(
            names(&files),
            vec![
                "confluence_data_2025-W52.csv",
                "confluence_data_2026-W02.csv",
                "confluence_data_2026-W10.csv"
            ]
        );
    }

    #[test]
    fn moves_oldest_beyond_limit_unmodified() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp, &["2025-W50", "2025-W51", "2025-W52", "2026-W01", "2026-W02"]);
        let manager = RetentionManager::new(&output(&tmp, 3, true)).unwrap();

        let archived = manager.prune().unwrap();

        assert_eq!(
            names(&archived),
            vec!["confluence_data_2025-W50.csv", "confluence_data_2025-W51.csv"]
        );
        let remaining = manager.weekly_files(tmp.path()).unwrap();
        assert_eq!(remaining.len(), 3);
        assert_eq!(
            std::fs::read_to_string(&archived[0]).unwrap(),
            "contents of 2025-W50"
        );
        let in_archive = manager.weekly_files(manager.archive_dir()).unwrap();
        assert_eq!(in_archive.len(), 2);
        assert!(tmp.path().join("confluence_data_current.csv").exists());
        assert!(tmp.path().join("confluence_data_history.csv").exists());
    }

    #[test]
    fn at_limit_is_noop() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp, &["2026-W01", "2026-W02"]);
        let manager = RetentionManager::new(&output(&tmp, 2, true)).unwrap();

        assert!(manager.prune().unwrap().is_empty());
        assert_eq!(manager.weekly_files(tmp.path()).unwrap().len(), 2);
    }

    #[test]
    fn disabled_archiving_is_noop() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp, &["2026-W01", "2026-W02", "2026-W03"]);
        let manager = RetentionManager::new(&output(&tmp, 1, false)).unwrap();

        assert!(manager.prune().unwrap().is_empty());
        assert_eq!(manager.weekly_files(tmp.path()).unwrap().len(), 3);
    }

    #[test]
    fn missing_folder_has_no_snapshots() {
        let tmp = TempDir::new().unwrap();
        let mut out = output(&tmp, 1, true);
        out.folder = tmp.path().join("absent");
        let manager = RetentionManager::new(&out).unwrap();

        assert!(manager.prune().unwrap().is_empty());
    }
}
