//! Per-item enrichment.
//!
//! Each sub-lookup is a fetch-or-default step: failures are logged and
//! replaced by the documented default, so no single lookup can stop the
//! item from being recorded. [`enrich_item`] composes them into an
//! [`EnrichmentResult`].

use crate::client::ContentApi;
use crate::config::{Config, FeatureDetection};
use crate::markup::count_features;
use crate::models::{ContentStats, EnrichmentResult, RawItem, UserActivity};
use crate::workflow::lookup_workflow;

/// Run every sub-lookup for `item`.
pub async fn enrich_item(
    api: &dyn ContentApi,
    item: &RawItem,
    config: &Config,
) -> EnrichmentResult {
    let child_pages = child_page_count(api, &item.id).await;
    let content = content_stats(api, &item.id, config.content.feature_detection).await;
    let activity = user_activity(item);
    let workflow = if config.workflow.enabled {
        lookup_workflow(api, &item.id, &config.workflow).await
    } else {
        None
    };

    EnrichmentResult {
        child_pages,
        content,
        activity,
        workflow,
    }
}

/// Direct child page count, 0 on failure.
pub async fn child_page_count(api: &dyn ContentApi, page_id: &str) -> u64 {
    match api.child_page_count(page_id).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(page_id, error = %e, "failed to retrieve child pages");
            0
        }
    }
}

/// Body-derived metrics. Everything is zero if the body cannot be fetched;
/// the attachment count alone falls back to zero on its own failure.
pub async fn content_stats(
    api: &dyn ContentApi,
    page_id: &str,
    detection: FeatureDetection,
) -> ContentStats {
    let body = match api.page_body(page_id).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(page_id, error = %e, "failed to retrieve content info");
            return ContentStats::default();
        }
    };

    let attachment_count = match api.attachment_count(page_id).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(page_id, error = %e, "failed to retrieve attachments");
            0
        }
    };

    let features = count_features(&body, detection);

    ContentStats {
        word_count: body.split_whitespace().count() as u64,
        char_count: body.chars().count() as u64,
        attachment_count,
        image_count: features.images,
        table_count: features.tables,
    }
}

/// Editing activity from the listing's version metadata; no remote call.
pub fn user_activity(item: &RawItem) -> UserActivity {
    let version = item.version.as_ref();
    UserActivity {
        last_editor: version
            .and_then(|v| v.by.as_ref())
            .map(|by| by.name())
            .unwrap_or_default(),
        edit_count: version.map(|v| v.number).unwrap_or(0),
        unique_contributors: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeApi;
    use crate::config::test_config;
    use crate::models::{UserRef, Version, WorkflowStatus};

    fn item(id: &str) -> RawItem {
        RawItem {
            id: id.to_string(),
            title: "T".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn collects_all_sub_results() {
        let mut api = FakeApi::default();
        api.children.insert("1".to_string(), 4);
        api.attachments.insert("1".to_string(), 2);
        api.bodies.insert(
            "1".to_string(),
            "<p>hello  world</p>\n<table></table><img src=\"x\"/>".to_string(),
        );
        api.statuses.insert(
            "1".to_string(),
            WorkflowStatus {
                workflow_name: "Review".to_string(),
                state: None,
            },
        );
        let config = test_config("https://wiki.example.com", &["ENG"]);

        let result = enrich_item(&api, &item("1"), &config).await;

        assert_eq!(result.child_pages, 4);
        assert_eq!(result.content.attachment_count, 2);
        // Tokens are whitespace-delimited markup, not rendered words.
        assert_eq!(result.content.word_count, 4);
        assert_eq!(result.content.table_count, 1);
        assert_eq!(result.content.image_count, 1);
        assert_eq!(result.workflow.unwrap().workflow_name, "Review");
    }

    #[tokio::test]
    async fn every_lookup_failing_still_yields_defaults() {
        let mut api = FakeApi::default();
        api.failing.insert("1".to_string());
        let config = test_config("https://wiki.example.com", &["ENG"]);

        let result = enrich_item(&api, &item("1"), &config).await;

        assert_eq!(result.child_pages, 0);
        assert_eq!(result.content, ContentStats::default());
        assert!(result.workflow.is_none());
        assert_eq!(result.activity.unique_contributors, 1);
    }

    #[tokio::test]
    async fn failed_body_skips_attachment_lookup() {
        let mut api = FakeApi::default();
        api.failing.insert("1".to_string());

        let stats = content_stats(&api, "1", FeatureDetection::Substring).await;

        assert_eq!(stats, ContentStats::default());
        assert_eq!(api.calls_matching("attachments:"), 0);
    }

    #[tokio::test]
    async fn empty_body_has_zero_metrics() {
        let mut api = FakeApi::default();
        api.bodies.insert("1".to_string(), String::new());
        api.attachments.insert("1".to_string(), 3);

        let stats = content_stats(&api, "1", FeatureDetection::Substring).await;

        assert_eq!(stats.word_count, 0);
        assert_eq!(stats.char_count, 0);
        assert_eq!(stats.image_count, 0);
        assert_eq!(stats.table_count, 0);
        assert_eq!(stats.attachment_count, 3);
    }

    #[tokio::test]
    async fn char_count_is_code_points() {
        let mut api = FakeApi::default();
        api.bodies.insert("1".to_string(), "naïve café".to_string());

        let stats = content_stats(&api, "1", FeatureDetection::Substring).await;

        assert_eq!(stats.char_count, 10);
        assert_eq!(stats.word_count, 2);
    }

    #[tokio::test]
    async fn disabled_workflow_makes_no_calls() {
        let api = FakeApi::default();
        let mut config = test_config("https://wiki.example.com", &["ENG"]);
        config.workflow.enabled = false;

        let result = enrich_item(&api, &item("1"), &config).await;

        assert!(result.workflow.is_none());
        assert_eq!(api.calls_matching("status:"), 0);
    }

    #[test]
    fn activity_prefers_display_name() {
        let mut raw = item("1");
        raw.version = Some(Version {
            by: Some(UserRef {
                display_name: Some("Jane Doe".to_string()),
                username: Some("jdoe".to_string()),
            }),
            number: 9,
            when: None,
        });

        let activity = user_activity(&raw);

        assert_eq!(activity.last_editor, "Jane Doe");
        assert_eq!(activity.edit_count, 9);
        assert_eq!(activity.unique_contributors, 1);
    }

    #[test]
    fn activity_without_version_is_empty() {
        let activity = user_activity(&item("1"));
        assert_eq!(activity.last_editor, "");
        assert_eq!(activity.edit_count, 0);
    }
}
