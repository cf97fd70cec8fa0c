//! The delivery pipeline: fetch, normalize, dedup, enrich, deliver, commit.
//!
//! Owns the at-most-once guarantee. A URI enters the seen-set strictly after
//! a confirmed delivery, never before; a lost success response can therefore
//! produce a second delivery attempt next cycle, which is accepted rather
//! than hidden.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::bsky::types::FeedViewPost;
use crate::delivery::{Bookmarker, DeliveryOutcome};
use crate::domain::{DeliveryPayload, NormalizedPost};
use crate::fetcher::{self, FeedSource};
use crate::normalizer::{self, thread};
use crate::store::Store;

/// Marker separating annotation sections.
const SECTION_RULE: &str = "\n---\n";
const SOURCE_LABEL: &str = "Bluesky";

pub struct Pipeline<'a> {
    pub source: &'a dyn FeedSource,
    pub store: &'a dyn Store,
    pub bookmarker: &'a dyn Bookmarker,
    /// Seen-set key, already namespaced per identity.
    pub seen_key: String,
    /// Depth cap for thread fetches.
    pub thread_depth: usize,
    /// Build payloads but deliver nothing.
    pub dry_run: bool,
    /// When set, each fetched feed window is written here as JSON.
    pub dump_dir: Option<PathBuf>,
}

impl Pipeline<'_> {
    /// One full pass over the current feed window, newest first. Returns the
    /// number of newly delivered posts.
    ///
    /// Cancellation is honored between posts, never mid-post.
    pub async fn run_cycle(&self, actor: &str, cancel: &CancellationToken) -> Result<usize> {
        let feed = fetcher::fetch_all_likes(self.source, actor).await?;
        info!(count = feed.len(), "fetched liked posts");

        if let Some(dir) = &self.dump_dir {
            self.dump_feed(dir, &feed)?;
        }

        let mut delivered = 0;
        let mut handled = HashSet::new();

        for item in &feed {
            if cancel.is_cancelled() {
                info!("shutdown requested, stopping cycle early");
                break;
            }

            let post = normalizer::normalize(item)?;

            if !handled.insert(post.uri.clone()) {
                continue;
            }
            if self.store.sismember(&self.seen_key, &post.uri)? {
                continue;
            }

            let payload = self.build_payload(&post).await?;

            if self.dry_run {
                info!(uri = %post.uri, "dry run, skipping delivery");
                debug!(?payload, "payload");
                continue;
            }

            match self.bookmarker.deliver(&payload).await {
                Ok(DeliveryOutcome::Accepted) => {
                    self.store.sadd(&self.seen_key, &post.uri)?;
                    delivered += 1;
                    info!(uri = %post.uri, "bookmarked");
                }
                Ok(DeliveryOutcome::Rejected(status)) => {
                    warn!(uri = %post.uri, status, "delivery rejected, will retry next cycle");
                }
                Err(e) => {
                    warn!(uri = %post.uri, error = %e, "delivery failed, will retry next cycle");
                }
            }
        }

        Ok(delivered)
    }

    async fn build_payload(&self, post: &NormalizedPost) -> Result<DeliveryPayload> {
        let mut annotation = format!("From {} at {}", SOURCE_LABEL, post.created_at.to_rfc3339());

        // An image post delivers the image as the primary reference and the
        // post URL as the secondary one.
        let (uri, secondary_uri) = match post.embed_images.first() {
            Some(image) => (image.clone(), Some(post.url.clone())),
            None => (post.url.clone(), None),
        };

        if let Some(caption) = &post.embed_caption {
            annotation.push_str(SECTION_RULE);
            annotation.push_str(caption);
        }

        let extra_images: Vec<&str> = post
            .embed_images
            .iter()
            .skip(1)
            .map(String::as_str)
            .collect();
        if !extra_images.is_empty() {
            annotation.push_str(SECTION_RULE);
            annotation.push_str(&extra_images.join("\n"));
        }

        for block in &post.quoted_blocks {
            annotation.push_str(SECTION_RULE);
            annotation.push_str(block);
        }

        if post.reply_count > 0 {
            let tree = self.source.post_thread(&post.uri, self.thread_depth).await?;
            let entries = thread::extract_own_thread(&tree);
            if !entries.is_empty() {
                let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
                annotation.push_str(SECTION_RULE);
                annotation.push_str(&texts.join("\n\n"));
            }
        }

        Ok(DeliveryPayload {
            uri,
            data: post.attributed_text(),
            annotation: Some(annotation),
            secondary_uri,
        })
    }

    fn dump_feed(&self, dir: &Path, feed: &[FeedViewPost]) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("likes-{}.json", Utc::now().format("%Y%m%dT%H%M%S")));
        std::fs::write(&path, serde_json::to_vec_pretty(feed)?)?;
        info!(path = %path.display(), "dumped raw feed window");
        Ok(())
    }
}
