//! Wire model for the slice of the Bluesky lexicon this crate consumes.
//!
//! Embeds come in two layers: the record-level schema tag (what the author
//! wrote) and the hydrated view (what the app view resolved, with fetchable
//! URLs). Both are modeled as closed `$type`-tagged unions with a trailing
//! untagged `Unsupported` variant, so unrecognized shapes deserialize instead
//! of failing the whole feed page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewBasic {
    pub did: String,
    pub handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl ProfileViewBasic {
    /// Display name, falling back to the handle when unset or empty.
    pub fn display_or_handle(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.handle,
        }
    }
}

/// The `app.bsky.feed.post` record: the source-of-truth schema for a post.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<RecordEmbed>,
}

/// Record-level embed tag. Only the tag matters here; the hydrated content
/// is read from the matching [`EmbedView`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "$type")]
pub enum RecordEmbed {
    #[serde(rename = "app.bsky.embed.images")]
    Images,
    #[serde(rename = "app.bsky.embed.video")]
    Video,
    #[serde(rename = "app.bsky.embed.external")]
    External,
    #[serde(rename = "app.bsky.embed.record")]
    Record,
    #[serde(rename = "app.bsky.embed.recordWithMedia")]
    RecordWithMedia,
    #[serde(untagged)]
    Unsupported(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "$type")]
pub enum EmbedView {
    #[serde(rename = "app.bsky.embed.images#view")]
    Images(ImagesView),
    #[serde(rename = "app.bsky.embed.external#view")]
    External(ExternalView),
    #[serde(rename = "app.bsky.embed.video#view")]
    Video(VideoView),
    #[serde(rename = "app.bsky.embed.record#view")]
    Record(RecordView),
    #[serde(rename = "app.bsky.embed.recordWithMedia#view")]
    RecordWithMedia(RecordWithMediaView),
    #[serde(untagged)]
    Unsupported(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImagesView {
    pub images: Vec<ViewImage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewImage {
    /// CDN URL of the thumbnail.
    pub thumb: String,
    /// CDN URL of the full-size rendition.
    pub fullsize: String,
    /// Alt text description of the image, for accessibility.
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExternalView {
    pub external: ViewExternal,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewExternal {
    pub uri: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    pub cid: String,
    pub playlist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RecordView {
    pub record: RecordViewUnion,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "$type")]
pub enum RecordViewUnion {
    #[serde(rename = "app.bsky.embed.record#viewRecord")]
    ViewRecord(ViewRecord),
    #[serde(rename = "app.bsky.embed.record#viewNotFound")]
    NotFound(ViewNotFound),
    #[serde(rename = "app.bsky.embed.record#viewBlocked")]
    Blocked(ViewBlocked),
    #[serde(rename = "app.bsky.feed.defs#generatorView")]
    Generator(GeneratorView),
    #[serde(untagged)]
    Unsupported(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRecord {
    pub uri: String,
    pub author: ProfileViewBasic,
    /// Raw record value; a quoted post's text and createdAt live here.
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<EmbedView>>,
    pub indexed_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewNotFound {
    pub uri: String,
    pub not_found: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewBlocked {
    pub uri: String,
    pub blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorView {
    pub uri: String,
    pub creator: ProfileViewBasic,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub indexed_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordWithMediaView {
    pub record: RecordView,
    pub media: MediaViewUnion,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "$type")]
pub enum MediaViewUnion {
    #[serde(rename = "app.bsky.embed.images#view")]
    Images(ImagesView),
    #[serde(rename = "app.bsky.embed.video#view")]
    Video(VideoView),
    #[serde(rename = "app.bsky.embed.external#view")]
    External(ExternalView),
    #[serde(untagged)]
    Unsupported(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub uri: String,
    pub cid: String,
    pub author: ProfileViewBasic,
    pub record: PostRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<EmbedView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<usize>,
    pub indexed_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedViewPost {
    pub post: PostView,
}

/// Output of `app.bsky.feed.getActorLikes`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AuthorFeed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub feed: Vec<FeedViewPost>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ThreadViewPost {
    pub post: PostView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<ThreadElement>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "$type")]
pub enum ThreadElement {
    #[serde(rename = "app.bsky.feed.defs#threadViewPost")]
    Post(ThreadViewPost),
    #[serde(rename = "app.bsky.feed.defs#notFoundPost")]
    NotFound(NotFoundPost),
    #[serde(rename = "app.bsky.feed.defs#blockedPost")]
    Blocked(BlockedPost),
    #[serde(untagged)]
    Unsupported(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundPost {
    pub uri: String,
    pub not_found: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedPost {
    pub uri: String,
    pub blocked: bool,
}

/// Output of `app.bsky.feed.getPostThread`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GetPostThreadOutput {
    pub thread: ThreadElement,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embed_view_tags_deserialize() {
        let embed: EmbedView = serde_json::from_value(json!({
            "$type": "app.bsky.embed.images#view",
            "images": [{"thumb": "t.jpg", "fullsize": "f.jpg", "alt": "a cat"}]
        }))
        .unwrap();

        match embed {
            EmbedView::Images(view) => {
                assert_eq!(view.images.len(), 1);
                assert_eq!(view.images[0].fullsize, "f.jpg");
            }
            other => panic!("unexpected embed: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_embed_type_falls_back_to_unsupported() {
        let embed: EmbedView = serde_json::from_value(json!({
            "$type": "app.bsky.embed.somethingNew#view",
            "payload": {"k": "v"}
        }))
        .unwrap();

        assert!(matches!(embed, EmbedView::Unsupported(_)));
    }

    #[test]
    fn test_record_embed_tag_ignores_content() {
        let record: PostRecord = serde_json::from_value(json!({
            "$type": "app.bsky.feed.post",
            "text": "look at this",
            "createdAt": "2024-05-01T10:00:00Z",
            "embed": {
                "$type": "app.bsky.embed.images",
                "images": [{"alt": "a cat", "image": {"ref": "x"}}]
            }
        }))
        .unwrap();

        assert_eq!(record.embed, Some(RecordEmbed::Images));
    }

    #[test]
    fn test_thread_tree_deserializes_recursively() {
        let thread: ThreadViewPost = serde_json::from_value(json!({
            "post": {
                "uri": "at://did:plc:root/app.bsky.feed.post/1",
                "cid": "cid1",
                "author": {"did": "did:plc:root", "handle": "alice.test"},
                "record": {"text": "root", "createdAt": "2024-05-01T10:00:00Z"},
                "indexedAt": "2024-05-01T10:00:01Z"
            },
            "replies": [{
                "$type": "app.bsky.feed.defs#threadViewPost",
                "post": {
                    "uri": "at://did:plc:root/app.bsky.feed.post/2",
                    "cid": "cid2",
                    "author": {"did": "did:plc:root", "handle": "alice.test"},
                    "record": {"text": "more", "createdAt": "2024-05-01T10:05:00Z"},
                    "indexedAt": "2024-05-01T10:05:01Z"
                }
            }, {
                "$type": "app.bsky.feed.defs#notFoundPost",
                "uri": "at://did:plc:gone/app.bsky.feed.post/9",
                "notFound": true
            }]
        }))
        .unwrap();

        let replies = thread.replies.unwrap();
        assert_eq!(replies.len(), 2);
        assert!(matches!(replies[0], ThreadElement::Post(_)));
        assert!(matches!(replies[1], ThreadElement::NotFound(_)));
    }

    #[test]
    fn test_display_or_handle_fallback() {
        let mut profile = ProfileViewBasic {
            did: "did:plc:x".into(),
            handle: "alice.test".into(),
            display_name: Some("Alice".into()),
            avatar: None,
        };
        assert_eq!(profile.display_or_handle(), "Alice");

        profile.display_name = Some(String::new());
        assert_eq!(profile.display_or_handle(), "alice.test");

        profile.display_name = None;
        assert_eq!(profile.display_or_handle(), "alice.test");
    }
}
