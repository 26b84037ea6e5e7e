//! Extraction pipeline orchestration.
//!
//! For each space: list pages → enrich each page → normalize into a
//! [`CanonicalRecord`]. Records from every space are gathered into one batch,
//! persisted by [`SnapshotStore`], and old weekly files are archived by
//! [`RetentionManager`]. Spaces and items are processed sequentially; batch
//! order follows listing order within a space, spaces in configured order.

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::client::{ContentApi, HttpContentApi};
use crate::config::{Config, Credentials};
use crate::enrich::enrich_item;
use crate::models::CanonicalRecord;
use crate::normalize::normalize;
use crate::paginate::list_space_pages;
use crate::progress::{should_report, ProgressEvent, ProgressReporter};
use crate::retention::RetentionManager;
use crate::snapshot::{SnapshotStore, WeekId};

/// Records and counters from one extraction pass.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<CanonicalRecord>,
    /// `(space_key, pages found)` in processing order.
    pub per_space: Vec<(String, usize)>,
    pub elapsed: Duration,
}

/// Options for [`run_extract`].
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    /// Restrict to these spaces instead of the configured list.
    pub spaces: Vec<String>,
    /// Override the computed week.
    pub week: Option<WeekId>,
    /// Extract and report without writing or pruning.
    pub dry_run: bool,
}

/// Extract, enrich and normalize every page of every space in `spaces`.
pub async fn extract_all(
    api: &dyn ContentApi,
    config: &Config,
    spaces: &[String],
    progress: &dyn ProgressReporter,
) -> Extraction {
    let started = Instant::now();
    let base_url = config.source.base();
    let mut extraction = Extraction::default();

    for space in spaces {
        tracing::info!(space_key = %space, "fetching pages");
        progress.report(ProgressEvent::Listing {
            space: space.clone(),
        });

        let pages = list_space_pages(api, space, config.source.page_size).await;
        tracing::info!(space_key = %space, pages = pages.len(), "listing complete");

        let total = pages.len();
        for (i, page) in pages.iter().enumerate() {
            if should_report(i, total) {
                progress.report(ProgressEvent::Enriching {
                    space: space.clone(),
                    n: (i + 1) as u64,
                    total: total as u64,
                });
            }
            let enrichment = enrich_item(api, page, config).await;
            extraction
                .records
                .push(normalize(page, &enrichment, base_url));
        }

        extraction.per_space.push((space.clone(), total));
    }

    extraction.elapsed = started.elapsed();
    extraction
}

/// The `run` command: extract, persist, prune, print a summary.
pub async fn run_extract(
    config: &Config,
    options: RunOptions,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let api = HttpContentApi::new(config, credentials)?;

    let spaces = if options.spaces.is_empty() {
        config.source.space_keys.clone()
    } else {
        options.spaces.clone()
    };
    let week = options.week.unwrap_or_else(WeekId::current);

    tracing::info!(
        week = %week,
        folder = %config.output.folder.display(),
        spaces = spaces.len(),
        "starting extraction"
    );

    let extraction = extract_all(&api, config, &spaces, progress).await;

    println!("extract {}", week);
    for (space, count) in &extraction.per_space {
        println!("  {}: {} pages", space, count);
    }
    println!(
        "  records: {} across {} spaces",
        extraction.records.len(),
        extraction.per_space.len()
    );
    println!("  elapsed: {:.2}s", extraction.elapsed.as_secs_f64());

    if options.dry_run {
        println!("  dry run: nothing written");
        println!("ok");
        return Ok(());
    }

    let store = SnapshotStore::new(&config.output);
    let outcome = store.persist(&extraction.records, week)?;
    if outcome.records == 0 {
        println!("  no data to write");
    }
    for path in [&outcome.current, &outcome.weekly, &outcome.history]
        .into_iter()
        .flatten()
    {
        println!("  wrote: {}", path.display());
    }

    let archived = RetentionManager::new(&config.output)?.prune()?;
    println!("  archived snapshots: {}", archived.len());
    println!("ok");
    Ok(())
}

/// The `prune` command: retention only.
pub fn run_prune(config: &Config) -> Result<()> {
    let manager = RetentionManager::new(&config.output)?;
    let archived = manager.prune()?;
    for path in &archived {
        println!("archived: {}", path.display());
    }
    println!("archived snapshots: {}", archived.len());
    Ok(())
}
