//! TOML configuration and credential loading.
//!
//! A single [`Config`] value is loaded once at startup and passed by
//! reference into the pipeline. Credentials never live in the file; they are
//! read from `CONFLUENCE_EMAIL` and `CONFLUENCE_API_TOKEN`.
//!
//! ```toml
//! [source]
//! base_url = "https://confluence.example.com"
//! space_keys = ["ENG", "OPS"]
//!
//! [workflow]
//! owner_param_id = "owner"
//! relevance_param_id = "relevance"
//!
//! [output]
//! folder = "confluence_data"
//! max_snapshots_to_keep = 12
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Largest page the listing endpoint will serve.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub space_keys: Vec<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

impl SourceConfig {
    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_owner_param")]
    pub owner_param_id: String,
    #[serde(default = "default_relevance_param")]
    pub relevance_param_id: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            owner_param_id: default_owner_param(),
            relevance_param_id: default_relevance_param(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_owner_param() -> String {
    "owner".to_string()
}
fn default_relevance_param() -> String {
    "relevance".to_string()
}

/// How image and table counts are estimated from storage-format markup.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeatureDetection {
    /// Count `<img` / `<table` occurrences. Matches historical CSVs.
    #[default]
    Substring,
    /// Walk the markup and count elements.
    Parsed,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ContentConfig {
    #[serde(default)]
    pub feature_detection: FeatureDetection,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_folder")]
    pub folder: PathBuf,
    #[serde(default = "default_true")]
    pub keep_history: bool,
    #[serde(default = "default_true")]
    pub archive_old_snapshots: bool,
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots_to_keep: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: default_output_folder(),
            keep_history: true,
            archive_old_snapshots: true,
            max_snapshots_to_keep: default_max_snapshots(),
        }
    }
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("confluence_data")
}
fn default_max_snapshots() -> usize {
    12
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Basic-auth credential pair for the content API.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub api_token: String,
}

impl Credentials {
    /// Load credentials from `CONFLUENCE_EMAIL` and `CONFLUENCE_API_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let email = std::env::var("CONFLUENCE_EMAIL")
            .context("CONFLUENCE_EMAIL environment variable not set")?;
        let api_token = std::env::var("CONFLUENCE_API_TOKEN")
            .context("CONFLUENCE_API_TOKEN environment variable not set")?;
        Ok(Self { email, api_token })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;

    if let Ok(base_url) = std::env::var("CONFLUENCE_BASE_URL") {
        if !base_url.trim().is_empty() {
            config.source.base_url = base_url;
        }
    }

    validate(&config)?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

fn validate(config: &Config) -> Result<()> {
    let base = config.source.base_url.trim();
    if base.is_empty() {
        bail!("source.base_url must not be empty");
    }
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        bail!(
            "source.base_url must start with http:// or https://, got '{}'",
            base
        );
    }

    if config.source.space_keys.is_empty() {
        bail!("source.space_keys must list at least one space");
    }
    if config.source.space_keys.iter().any(|k| k.trim().is_empty()) {
        bail!("source.space_keys must not contain empty keys");
    }

    if !(1..=MAX_PAGE_SIZE).contains(&config.source.page_size) {
        bail!("source.page_size must be in [1, {}]", MAX_PAGE_SIZE);
    }

    if config.workflow.enabled
        && (config.workflow.owner_param_id.is_empty()
            || config.workflow.relevance_param_id.is_empty())
    {
        bail!("workflow parameter ids must be set when workflow lookups are enabled");
    }

    if config.output.max_snapshots_to_keep == 0 {
        bail!("output.max_snapshots_to_keep must be >= 1");
    }

    if config.http.timeout_secs == 0 {
        bail!("http.timeout_secs must be > 0");
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn test_config(base_url: &str, spaces: &[&str]) -> Config {
    Config {
        source: SourceConfig {
            base_url: base_url.to_string(),
            space_keys: spaces.iter().map(|s| s.to_string()).collect(),
            page_size: MAX_PAGE_SIZE,
        },
        workflow: WorkflowConfig::default(),
        content: ContentConfig::default(),
        output: OutputConfig::default(),
        http: HttpConfig::default(),
    }
}
