//! Overview of persisted artifacts.
//!
//! Used by `cledger snapshots` to show what the output folder holds: the
//! current snapshot, the history ledger, and the active and archived weekly
//! files with their sizes and row counts.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::retention::RetentionManager;
use crate::snapshot::{count_rows, SnapshotStore};

/// Run the snapshots command: list artifacts and print a summary.
pub fn run_snapshots(config: &Config) -> Result<()> {
    let store = SnapshotStore::new(&config.output);
    let retention = RetentionManager::new(&config.output)?;

    println!("Snapshot folder: {}", store.root().display());
    println!();
    println!("  {:<40} {:>10} {:>8}", "FILE", "SIZE", "ROWS");
    println!("  {}", "-".repeat(60));

    print_artifact(&store.current_path());
    print_artifact(&store.history_path());

    let active = retention.weekly_files(store.root())?;
    for path in &active {
        print_artifact(path);
    }

    let archived = retention.weekly_files(retention.archive_dir())?;
    println!();
    println!(
        "  Weekly snapshots: {} active (limit {}), {} archived",
        active.len(),
        config.output.max_snapshots_to_keep,
        archived.len()
    );
    if let (Some(first), Some(last)) = (archived.first(), archived.last()) {
        println!(
            "  Archive range:    {} .. {}",
            file_name(first),
            file_name(last)
        );
    }

    Ok(())
}

fn print_artifact(path: &Path) {
    let name = file_name(path);
    match std::fs::metadata(path) {
        Ok(meta) => {
            let rows = count_rows(path)
                .map(|n| n.to_string())
                .unwrap_or_else(|_| "?".to_string());
            println!("  {:<40} {:>10} {:>8}", name, format_bytes(meta.len()), rows);
        }
        Err(_) => println!("  {:<40} {:>10} {:>8}", name, "missing", "-"),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
