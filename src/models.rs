//! Core data models.
//!
//! Wire types ([`RawItem`], [`WorkflowStatus`], [`WorkflowParameters`]) mirror
//! the JSON the content API returns. Missing, `null` or mistyped optional
//! fields decode to their defaults rather than rejecting the document. The
//! intermediate enrichment types are per-item and short-lived; the only
//! persisted type is [`CanonicalRecord`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Decode a field, falling back to its default on `null` or a type mismatch.
fn lenient<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(de)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Identifiers arrive as strings or bare numbers.
fn id_text<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// One content item as returned by the listing endpoint.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawItem {
    #[serde(default, deserialize_with = "id_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    /// Space the item was listed from. Set by the paginator, not the wire.
    #[serde(skip)]
    pub space_key: String,
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<Version>,
    #[serde(default, deserialize_with = "lenient")]
    pub history: Option<History>,
    /// Only the length matters.
    #[serde(default, deserialize_with = "lenient")]
    pub ancestors: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Version {
    #[serde(default, deserialize_with = "lenient")]
    pub by: Option<UserRef>,
    #[serde(default, deserialize_with = "lenient")]
    pub number: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub when: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct History {
    #[serde(default, rename = "createdBy", deserialize_with = "lenient")]
    pub created_by: Option<UserRef>,
    #[serde(default, rename = "createdDate", deserialize_with = "lenient")]
    pub created_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UserRef {
    #[serde(default, rename = "displayName", deserialize_with = "lenient")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub username: Option<String>,
}

impl UserRef {
    /// Display name, falling back to the login name, then to empty.
    pub fn name(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Metadata {
    #[serde(default, deserialize_with = "lenient")]
    pub labels: Option<LabelPage>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LabelPage {
    #[serde(default, deserialize_with = "lenient")]
    pub results: Vec<Label>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Label {
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
}

impl RawItem {
    /// Labels in the order the listing returned them.
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.metadata
            .iter()
            .filter_map(|m| m.labels.as_ref())
            .flat_map(|page| page.results.iter())
    }
}

/// A workflow parameter as it appears in status transitions and the flat
/// parameters document.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WorkflowParameter {
    #[serde(default, deserialize_with = "id_text")]
    pub id: String,
    #[serde(default)]
    pub value: Value,
}

impl WorkflowParameter {
    /// Strings verbatim, `null` as empty, anything else as compact JSON.
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Transition {
    #[serde(default, deserialize_with = "lenient")]
    pub parameters: Vec<WorkflowParameter>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Transitions {
    #[serde(default, deserialize_with = "lenient")]
    pub submit: Option<Transition>,
    #[serde(default, deserialize_with = "lenient")]
    pub select: Vec<Transition>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct WorkflowState {
    #[serde(default, deserialize_with = "lenient")]
    pub transitions: Transitions,
}

/// Workflow status document for one item.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WorkflowStatus {
    #[serde(default, rename = "workflowName", deserialize_with = "lenient")]
    pub workflow_name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub state: Option<WorkflowState>,
}

/// Flat workflow parameters document for one item.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WorkflowParameters {
    #[serde(default, rename = "workflowParameters", deserialize_with = "lenient")]
    pub workflow_parameters: Option<Vec<WorkflowParameter>>,
}

/// Content metrics derived from an item's body. All zero when unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentStats {
    pub word_count: u64,
    pub char_count: u64,
    pub attachment_count: u64,
    pub image_count: u64,
    pub table_count: u64,
}

/// Editing activity derived from the already-fetched version metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserActivity {
    pub last_editor: String,
    pub edit_count: u64,
    /// Always 1: the current version alone cannot enumerate past editors.
    pub unique_contributors: u64,
}

/// Resolved workflow data for an item with a workflow attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowInfo {
    pub workflow_name: String,
    pub owner_value: String,
    pub project_relevance: String,
}

/// Independently obtained sub-results for one [`RawItem`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentResult {
    pub child_pages: u64,
    pub content: ContentStats,
    pub activity: UserActivity,
    pub workflow: Option<WorkflowInfo>,
}

/// One persisted row. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub space_key: String,
    pub page_title: String,
    pub page_url: String,
    pub page_created: String,
    pub date_modified: String,
    pub creator_name: String,
    pub page_depth: u64,
    pub child_pages: u64,
    pub workflow_name: String,
    pub owner_value: String,
    pub project_relevance: String,
    pub labels: String,
    pub word_count: u64,
    pub char_count: u64,
    pub attachment_count: u64,
    pub image_count: u64,
    pub table_count: u64,
    pub unique_contributors: u64,
    pub edit_count: u64,
    pub last_editor: String,
    pub extraction_date: String,
    pub extraction_time: String,
}

/// Column names in persisted order.
pub const FIELD_NAMES: [&str; 22] = [
    "space_key",
    "page_title",
    "page_url",
    "page_created",
    "date_modified",
    "creator_name",
    "page_depth",
    "child_pages",
    "workflow_name",
    "owner_value",
    "project_relevance",
    "labels",
    "word_count",
    "char_count",
    "attachment_count",
    "image_count",
    "table_count",
    "unique_contributors",
    "edit_count",
    "last_editor",
    "extraction_date",
    "extraction_time",
];
