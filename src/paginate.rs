//! Listing traversal for one space.

use crate::client::ContentApi;
use crate::models::RawItem;

/// Retrieve every current-status item in `space_key`.
///
/// Requests pages of `page_size` items, advancing the offset by the page
/// size until a short page signals the end. A failed request is logged and
/// ends the traversal; items gathered so far are kept. Each item is tagged
/// with the space it came from.
pub async fn list_space_pages(
    api: &dyn ContentApi,
    space_key: &str,
    page_size: usize,
) -> Vec<RawItem> {
    let mut all_pages = Vec::new();
    let mut start = 0usize;

    loop {
        let results = match api.list_pages(space_key, start, page_size).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    space_key,
                    start,
                    error = %e,
                    "failed to retrieve pages; stopping pagination for this space"
                );
                break;
            }
        };

        let fetched = results.len();
        all_pages.extend(results.into_iter().map(|mut page| {
            page.space_key = space_key.to_string();
            page
        }));

        if fetched < page_size {
            break;
        }
        start += page_size;
    }

    all_pages
}
