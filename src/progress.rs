//! Extraction progress reporting.
//!
//! Progress is emitted on **stderr** so the stdout summary stays parseable
//! for scripts. Listing a space has no known total; enrichment reports
//! `n / total` for the first item, every 100th item, and the last item.

use std::io::Write;

/// How often enrichment progress is reported.
pub const REPORT_EVERY: usize = 100;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Paging through a space's listing.
    Listing { space: String },
    /// Enriching item `n` of `total` in a space.
    Enriching { space: String, n: u64, total: u64 },
}

/// True for the item indices that should produce an `Enriching` event.
pub fn should_report(index: usize, total: usize) -> bool {
    index % REPORT_EVERY == 0 || index + 1 == total
}

/// Reports extraction progress.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress: "extract ENG  enriching  1,200 / 5,000 pages".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Listing { space } => format!("extract {}  listing pages...\n", space),
            ProgressEvent::Enriching { space, n, total } => format!(
                "extract {}  enriching  {} / {} pages\n",
                space,
                format_number(*n),
                format_number(*total)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Listing { space } => serde_json::json!({
                "event": "progress",
                "space": space,
                "phase": "listing"
            }),
            ProgressEvent::Enriching { space, n, total } => serde_json::json!({
                "event": "progress",
                "space": space,
                "phase": "enriching",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode selected on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    Auto,
    Off,
    Human,
    Json,
}

impl ProgressMode {
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Auto if atty::is(atty::Stream::Stderr) => Box::new(StderrProgress),
            ProgressMode::Auto | ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
