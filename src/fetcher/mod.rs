//! Pagination against the feed source.

use async_trait::async_trait;
use tracing::debug;

use crate::app::Result;
use crate::bsky::types::{AuthorFeed, FeedViewPost, ThreadViewPost};

/// Posts requested per page; the source caps pages at 100.
pub const PAGE_SIZE: u8 = 100;

/// Read side of the feed source. The pipeline is tested through this seam.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn likes_page(
        &self,
        actor: &str,
        limit: u8,
        cursor: Option<&str>,
    ) -> Result<AuthorFeed>;

    async fn post_thread(&self, uri: &str, depth: usize) -> Result<ThreadViewPost>;
}

/// Collects the complete current window of liked posts, newest first.
///
/// Pages with a cursor until the source returns an empty page or stops
/// handing back a cursor. Cost is proportional to the total like count, not
/// to new likes, so the polling interval has to be tuned against feed size
/// and source rate limits. A failed page fetch aborts the whole cycle; no
/// partial accumulation is kept.
pub async fn fetch_all_likes(source: &dyn FeedSource, actor: &str) -> Result<Vec<FeedViewPost>> {
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = source.likes_page(actor, PAGE_SIZE, cursor.as_deref()).await?;
        if page.feed.is_empty() {
            break;
        }
        if page.feed.len() < PAGE_SIZE as usize {
            debug!(count = page.feed.len(), "short page, end of feed window");
        }
        items.extend(page.feed);

        cursor = page.cursor;
        if cursor.is_none() {
            break;
        }
    }

    Ok(items)
}
