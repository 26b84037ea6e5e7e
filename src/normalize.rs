//! Canonical record construction.
//!
//! Merging is pure: every missing input degrades to an empty string or zero.
//! The only impure input is the extraction stamp, which [`normalize`] reads
//! from the local clock and [`normalize_at`] takes as an argument.

use chrono::{DateTime, Local, NaiveDateTime};

use crate::models::{CanonicalRecord, EnrichmentResult, RawItem};

/// Wall-clock moment a record was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionStamp {
    pub date: String,
    pub time: String,
}

impl ExtractionStamp {
    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    pub fn from_datetime(at: NaiveDateTime) -> Self {
        Self {
            date: at.format("%Y-%m-%d").to_string(),
            time: at.format("%H:%M:%S").to_string(),
        }
    }
}

/// Normalize with the current local time as the extraction stamp.
pub fn normalize(
    item: &RawItem,
    enrichment: &EnrichmentResult,
    base_url: &str,
) -> CanonicalRecord {
    normalize_at(item, enrichment, base_url, ExtractionStamp::now())
}

pub fn normalize_at(
    item: &RawItem,
    enrichment: &EnrichmentResult,
    base_url: &str,
    stamp: ExtractionStamp,
) -> CanonicalRecord {
    let history = item.history.as_ref();
    let workflow = enrichment.workflow.clone().unwrap_or_default();

    CanonicalRecord {
        space_key: item.space_key.clone(),
        page_title: item.title.clone(),
        page_url: page_url(base_url, &item.id),
        page_created: history
            .and_then(|h| h.created_date.as_deref())
            .map(calendar_date)
            .unwrap_or_default(),
        date_modified: item
            .version
            .as_ref()
            .and_then(|v| v.when.as_deref())
            .map(calendar_date)
            .unwrap_or_default(),
        creator_name: history
            .and_then(|h| h.created_by.as_ref())
            .map(|u| u.name())
            .unwrap_or_default(),
        page_depth: item.ancestors.len() as u64,
        child_pages: enrichment.child_pages,
        workflow_name: workflow.workflow_name,
        owner_value: workflow.owner_value,
        project_relevance: workflow.project_relevance,
        labels: item
            .labels()
            .map(|l| l.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        word_count: enrichment.content.word_count,
        char_count: enrichment.content.char_count,
        attachment_count: enrichment.content.attachment_count,
        image_count: enrichment.content.image_count,
        table_count: enrichment.content.table_count,
        unique_contributors: enrichment.activity.unique_contributors,
        edit_count: enrichment.activity.edit_count,
        last_editor: enrichment.activity.last_editor.clone(),
        extraction_date: stamp.date,
        extraction_time: stamp.time,
    }
}

pub fn page_url(base_url: &str, page_id: &str) -> String {
    format!(
        "{}/pages/viewpage.action?pageId={}",
        base_url.trim_end_matches('/'),
        page_id
    )
}

/// `YYYY-MM-DD` in the timestamp's own offset, empty if unparseable.
///
/// Accepts RFC 3339 and the colon-less offset form (`+0200`) some server
/// versions emit.
pub fn calendar_date(timestamp: &str) -> String {
    let timestamp = timestamp.trim();
    DateTime::parse_from_rfc3339(timestamp)
        .or_else(|_| DateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
