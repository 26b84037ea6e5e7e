//! Content API access.
//!
//! [`ContentApi`] is the seam between the pipeline and the remote Confluence
//! instance. [`HttpContentApi`] implements it over the REST API with basic
//! auth; tests substitute an in-memory implementation.
//!
//! # Endpoints
//!
//! | Call | Path |
//! |------|------|
//! | listing | `GET /rest/api/content?spaceKey=..&expand=..&status=current&start=..&limit=..` |
//! | children | `GET /rest/api/content/{id}/child/page` |
//! | body | `GET /rest/api/content/{id}?expand=body.storage` |
//! | attachments | `GET /rest/api/content/{id}/child/attachment` |
//! | workflow status | `GET /rest/cw/1/content/{id}/status` |
//! | workflow parameters | `GET /rest/cw/1/content/{id}/parameters` |
//!
//! Non-success responses become errors carrying the status and the start of
//! the response body. Callers decide what default to fall back to.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{Config, Credentials, MAX_PAGE_SIZE};
use crate::models::{RawItem, WorkflowParameters, WorkflowStatus};

/// Metadata expansions requested on every listing page.
pub const LISTING_EXPAND: &str = "version,metadata.labels,history,ancestors";

/// Remote operations the pipeline depends on.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// One page of current-status items in `space_key`, starting at `start`.
    async fn list_pages(&self, space_key: &str, start: usize, limit: usize)
        -> Result<Vec<RawItem>>;

    /// Number of direct child pages.
    async fn child_page_count(&self, page_id: &str) -> Result<u64>;

    /// Storage-format body markup. Empty when the item has no body.
    async fn page_body(&self, page_id: &str) -> Result<String>;

    /// Number of attachments on the item.
    async fn attachment_count(&self, page_id: &str) -> Result<u64>;

    /// Workflow status, or `None` when no workflow is attached.
    async fn workflow_status(&self, page_id: &str) -> Result<Option<WorkflowStatus>>;

    /// Flat workflow parameters document, or `None` when unavailable.
    async fn workflow_parameters(&self, page_id: &str) -> Result<Option<WorkflowParameters>>;
}

#[derive(Deserialize)]
struct ListResponse {
    /// Decoded item by item so one bad entry cannot reject the page.
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct SizeResponse {
    #[serde(default)]
    size: u64,
}

#[derive(Deserialize, Default)]
struct BodyResponse {
    #[serde(default)]
    body: Option<Body>,
}

#[derive(Deserialize, Default)]
struct Body {
    #[serde(default)]
    storage: Option<Storage>,
}

#[derive(Deserialize, Default)]
struct Storage {
    #[serde(default)]
    value: String,
}

/// [`ContentApi`] over the Confluence REST API.
pub struct HttpContentApi {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpContentApi {
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.source.base().to_string(),
            credentials,
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .get(&url)
            .basic_auth(&self.credentials.email, Some(&self.credentials.api_token))
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))
    }

    /// GET and decode a JSON body, failing on any non-success status.
    async fn get_json<T: DeserializeOwned + Send>(
        &self,
        what: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let resp = self.get(path, query).await?;
        let resp = ensure_success(what, resp).await?;
        resp.json::<T>()
            .await
            .with_context(|| format!("{} returned malformed JSON", what))
    }

    /// GET a JSON document where 204 or an empty body means "absent".
    async fn get_optional_json<T: DeserializeOwned + Send>(
        &self,
        what: &str,
        path: &str,
    ) -> Result<Option<T>> {
        let resp = self.get(path, &[]).await?;
        if resp.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let resp = ensure_success(what, resp).await?;
        let text = resp.text().await?;
        parse_optional_document(&text)
            .with_context(|| format!("{} returned malformed JSON", what))
    }

    /// Sum `size` across every page of a child collection.
    async fn count_children(&self, what: &str, path: &str) -> Result<u64> {
        let mut total = 0u64;
        let mut start = 0usize;
        loop {
            let query = [
                ("start", start.to_string()),
                ("limit", MAX_PAGE_SIZE.to_string()),
            ];
            let page: SizeResponse = self.get_json(what, path, &query).await?;
            total += page.size;
            if page.size < MAX_PAGE_SIZE as u64 {
                break;
            }
            start += MAX_PAGE_SIZE;
        }
        Ok(total)
    }
}

async fn ensure_success(what: &str, resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    bail!(
        "{} failed (HTTP {}): {}",
        what,
        status,
        body.chars().take(500).collect::<String>()
    );
}

/// Decode listing entries one by one. An entry that is not an item object
/// still occupies its slot as an empty item, so page lengths stay intact for
/// the paginator's short-page check.
fn decode_items(values: Vec<serde_json::Value>) -> Vec<RawItem> {
    values
        .into_iter()
        .map(|value| match serde_json::from_value::<RawItem>(value) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(error = %e, "malformed listing entry, recording defaults");
                RawItem::default()
            }
        })
        .collect()
}

/// Empty text, `null` and `{}` all mean the document is absent.
fn parse_optional_document<T: DeserializeOwned>(text: &str) -> Result<Option<T>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(text)?;
    let absent = match &value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if absent {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn list_pages(
        &self,
        space_key: &str,
        start: usize,
        limit: usize,
    ) -> Result<Vec<RawItem>> {
        let query = [
            ("spaceKey", space_key.to_string()),
            ("expand", LISTING_EXPAND.to_string()),
            ("status", "current".to_string()),
            ("start", start.to_string()),
            ("limit", limit.to_string()),
        ];
        let page: ListResponse = self
            .get_json("content listing", "/rest/api/content", &query)
            .await?;
        Ok(decode_items(page.results))
    }

    async fn child_page_count(&self, page_id: &str) -> Result<u64> {
        let path = format!("/rest/api/content/{}/child/page", page_id);
        self.count_children("child page lookup", &path).await
    }

    async fn page_body(&self, page_id: &str) -> Result<String> {
        let path = format!("/rest/api/content/{}", page_id);
        let query = [("expand", "body.storage".to_string())];
        let resp: BodyResponse = self.get_json("body fetch", &path, &query).await?;
        Ok(resp
            .body
            .and_then(|b| b.storage)
            .map(|s| s.value)
            .unwrap_or_default())
    }

    async fn attachment_count(&self, page_id: &str) -> Result<u64> {
        let path = format!("/rest/api/content/{}/child/attachment", page_id);
        self.count_children("attachment lookup", &path).await
    }

    async fn workflow_status(&self, page_id: &str) -> Result<Option<WorkflowStatus>> {
        let path = format!("/rest/cw/1/content/{}/status", page_id);
        self.get_optional_json("workflow status", &path).await
    }

    async fn workflow_parameters(&self, page_id: &str) -> Result<Option<WorkflowParameters>> {
        let path = format!("/rest/cw/1/content/{}/parameters", page_id);
        self.get_optional_json("workflow parameters", &path).await
    }
}

/// In-memory [`ContentApi`] for unit tests.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeApi {
        pub spaces: HashMap<String, Vec<RawItem>>,
        /// Spaces whose listing fails once `start` reaches the given offset.
        pub listing_fails_at: HashMap<String, usize>,
        pub children: HashMap<String, u64>,
        pub bodies: HashMap<String, String>,
        pub attachments: HashMap<String, u64>,
        pub statuses: HashMap<String, WorkflowStatus>,
        pub parameters: HashMap<String, WorkflowParameters>,
        /// Page ids for which every lookup fails.
        pub failing: HashSet<String>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        pub fn with_space(mut self, key: &str, count: usize) -> Self {
            let items = (0..count)
                .map(|i| RawItem {
                    id: format!("{}-{}", key, i),
                    title: format!("Page {} {}", key, i),
                    ..Default::default()
                })
                .collect();
            self.spaces.insert(key.to_string(), items);
            self
        }

        pub fn calls_matching(&self, prefix: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.starts_with(prefix))
                .count()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn check(&self, page_id: &str) -> Result<()> {
            if self.failing.contains(page_id) {
                bail!("lookup failed (HTTP 500 Internal Server Error): boom");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ContentApi for FakeApi {
        async fn list_pages(
            &self,
            space_key: &str,
            start: usize,
            limit: usize,
        ) -> Result<Vec<RawItem>> {
            self.record(format!("list:{}:{}", space_key, start));
            if let Some(&fail_at) = self.listing_fails_at.get(space_key) {
                if start >= fail_at {
                    bail!("content listing failed (HTTP 500 Internal Server Error): down");
                }
            }
            let items = self.spaces.get(space_key).cloned().unwrap_or_default();
            Ok(items.into_iter().skip(start).take(limit).collect())
        }

        async fn child_page_count(&self, page_id: &str) -> Result<u64> {
            self.record(format!("children:{}", page_id));
            self.check(page_id)?;
            Ok(self.children.get(page_id).copied().unwrap_or(0))
        }

        async fn page_body(&self, page_id: &str) -> Result<String> {
            self.record(format!("body:{}", page_id));
            self.check(page_id)?;
            Ok(self.bodies.get(page_id).cloned().unwrap_or_default())
        }

        async fn attachment_count(&self, page_id: &str) -> Result<u64> {
            self.record(format!("attachments:{}", page_id));
            self.check(page_id)?;
            Ok(self.attachments.get(page_id).copied().unwrap_or(0))
        }

        async fn workflow_status(&self, page_id: &str) -> Result<Option<WorkflowStatus>> {
            self.record(format!("status:{}", page_id));
            self.check(page_id)?;
            Ok(self.statuses.get(page_id).cloned())
        }

        async fn workflow_parameters(
            &self,
            page_id: &str,
        ) -> Result<Option<WorkflowParameters>> {
            self.record(format!("parameters:{}", page_id));
            self.check(page_id)?;
            Ok(self.parameters.get(page_id).cloned())
        }
    }
}
