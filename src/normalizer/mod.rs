//! Flattens the feed source's polymorphic embed shapes into a single
//! annotated record.
//!
//! Normalization branches on the pair of (record-level embed tag, hydrated
//! view tag): the record is the source-of-truth schema, the view carries the
//! resolved URLs, and only an agreeing pair is trusted. Mismatched, absent,
//! or unrecognized pairs simply yield a plain-text post.

pub mod thread;

use serde_json::Value;

use crate::app::{Result, SkymarkError};
use crate::bsky::types::{
    EmbedView, FeedViewPost, MediaViewUnion, PostView, ProfileViewBasic, RecordEmbed,
    RecordViewUnion, ViewImage,
};
use crate::domain::NormalizedPost;

const POST_COLLECTION: &str = "app.bsky.feed.post";

/// Produces the flat representation of one liked post.
///
/// Fails with [`SkymarkError::UnsupportedPostKind`] when the URI does not
/// identify a feed-post record. Pure and deterministic.
pub fn normalize(item: &FeedViewPost) -> Result<NormalizedPost> {
    let post = &item.post;

    if !is_feed_post(&post.uri) {
        return Err(SkymarkError::UnsupportedPostKind(post.uri.clone()));
    }

    let mut normalized = NormalizedPost {
        uri: post.uri.clone(),
        author_handle: post.author.handle.clone(),
        author_display_name: post.author.display_or_handle().to_string(),
        body_text: post.record.text.clone(),
        created_at: post.record.created_at,
        reply_count: post.reply_count.unwrap_or(0),
        url: web_url(&post.author.handle, &post.uri),
        embed_images: Vec::new(),
        embed_caption: None,
        quoted_blocks: Vec::new(),
    };

    apply_embed(&mut normalized, post);
    Ok(normalized)
}

/// An `at://` URI identifies a record as `at://<authority>/<collection>/<rkey>`.
fn is_feed_post(uri: &str) -> bool {
    uri.strip_prefix("at://")
        .and_then(|rest| rest.split('/').nth(1))
        .is_some_and(|collection| collection == POST_COLLECTION)
}

/// Human-facing URL for a post record URI.
pub fn web_url(handle: &str, uri: &str) -> String {
    let rkey = uri.rsplit('/').next().unwrap_or_default();
    format!("https://bsky.app/profile/{handle}/post/{rkey}")
}

fn apply_embed(out: &mut NormalizedPost, post: &PostView) {
    match (&post.record.embed, &post.embed) {
        (Some(RecordEmbed::Images), Some(EmbedView::Images(view))) => {
            collect_images(out, &view.images);
        }
        (Some(RecordEmbed::RecordWithMedia), Some(EmbedView::RecordWithMedia(view))) => {
            if quoted_is_gone(&view.record.record) {
                return;
            }
            match &view.media {
                MediaViewUnion::External(media) => {
                    out.embed_caption = non_empty(media.external.description.clone());
                    out.embed_images.extend(media.external.thumb.clone());
                }
                MediaViewUnion::Images(media) => {
                    out.embed_images
                        .extend(media.images.iter().map(|i| i.fullsize.clone()));
                    out.embed_caption = media
                        .images
                        .first()
                        .map(|i| i.alt.clone())
                        .and_then(non_empty);
                }
                MediaViewUnion::Video(media) => {
                    out.embed_images.extend(media.thumbnail.clone());
                    out.embed_caption = media.alt.clone().and_then(non_empty);
                }
                MediaViewUnion::Unsupported(_) => {}
            }
            push_quote_block(out, &view.record.record);
        }
        (Some(RecordEmbed::Record), Some(EmbedView::Record(view))) => {
            if quoted_is_gone(&view.record) {
                return;
            }
            push_quote_block(out, &view.record);
        }
        (Some(RecordEmbed::External), Some(EmbedView::External(view))) => {
            // A link card is attributed to the liking post's own author.
            let text = if view.external.description.is_empty() {
                view.external.title.clone()
            } else {
                format!("{}\n{}", view.external.title, view.external.description)
            };
            let block = format_quote(
                &text,
                &post.author.handle,
                post.author.display_or_handle(),
                &post.record.created_at.to_rfc3339(),
            );
            out.quoted_blocks.push(block);
        }
        (Some(RecordEmbed::Video), Some(EmbedView::Video(view))) => {
            out.embed_images.extend(view.thumbnail.clone());
            out.embed_caption = view.alt.clone().and_then(non_empty);
        }
        // Absent, mismatched, or unsupported pairs: a plain text post.
        _ => {}
    }
}

fn collect_images(out: &mut NormalizedPost, images: &[ViewImage]) {
    out.embed_images
        .extend(images.iter().map(|i| i.fullsize.clone()));

    let alts: Vec<&str> = images
        .iter()
        .map(|i| i.alt.as_str())
        .filter(|alt| !alt.is_empty())
        .collect();
    if !alts.is_empty() {
        out.embed_caption = Some(alts.join(", "));
    }
}

/// The quoted content was deleted or is otherwise unavailable; the embed
/// carries no usable payload at all.
fn quoted_is_gone(record: &RecordViewUnion) -> bool {
    matches!(record, RecordViewUnion::NotFound(_))
}

fn push_quote_block(out: &mut NormalizedPost, record: &RecordViewUnion) {
    let Some(author) = quoted_author(record) else {
        return;
    };

    let text = quoted_text(record).unwrap_or_default();
    let created_at = quoted_created_at(record).unwrap_or_default();
    out.quoted_blocks.push(format_quote(
        &text,
        &author.handle,
        author.display_or_handle(),
        &created_at,
    ));

    out.embed_images.extend(quoted_images(record));
}

fn format_quote(text: &str, handle: &str, display_name: &str, created_at: &str) -> String {
    format!("\"{text}\" -- @{handle} / {display_name} at {created_at}")
}

/// First populated author among the positions a quoted record can carry one.
fn quoted_author(record: &RecordViewUnion) -> Option<&ProfileViewBasic> {
    match record {
        RecordViewUnion::ViewRecord(view) => Some(&view.author),
        RecordViewUnion::Generator(view) => Some(&view.creator),
        _ => None,
    }
}

fn quoted_text(record: &RecordViewUnion) -> Option<String> {
    match record {
        RecordViewUnion::ViewRecord(view) => lookup_str(
            &view.value,
            &[&["text"], &["record", "text"], &["value", "text"]],
        ),
        RecordViewUnion::Generator(view) => Some(match &view.description {
            Some(description) if !description.is_empty() => {
                format!("{}: {}", view.display_name, description)
            }
            _ => view.display_name.clone(),
        }),
        _ => None,
    }
}

fn quoted_created_at(record: &RecordViewUnion) -> Option<String> {
    match record {
        RecordViewUnion::ViewRecord(view) => lookup_str(
            &view.value,
            &[
                &["createdAt"],
                &["record", "createdAt"],
                &["value", "createdAt"],
            ],
        )
        .or_else(|| Some(view.indexed_at.clone())),
        RecordViewUnion::Generator(view) => Some(view.indexed_at.clone()),
        _ => None,
    }
}

/// Ordered accessor attempts over a raw record value; first hit wins.
fn lookup_str(value: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| {
        let mut node = value;
        for key in *path {
            node = node.get(key)?;
        }
        node.as_str().map(str::to_string)
    })
}

fn quoted_images(record: &RecordViewUnion) -> Vec<String> {
    let RecordViewUnion::ViewRecord(view) = record else {
        return Vec::new();
    };

    view.embeds
        .iter()
        .flatten()
        .filter_map(|embed| match embed {
            EmbedView::Images(images) => Some(images.images.iter().map(|i| i.fullsize.clone())),
            _ => None,
        })
        .flatten()
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
