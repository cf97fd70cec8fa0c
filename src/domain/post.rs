use chrono::{DateTime, Utc};

/// A liked post flattened into one displayable record, independent of which
/// embed shape the source used.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPost {
    /// The `at://` record URI, the dedup key.
    pub uri: String,
    pub author_handle: String,
    pub author_display_name: String,
    pub body_text: String,
    pub created_at: DateTime<Utc>,
    pub reply_count: usize,
    /// Human-facing bsky.app URL.
    pub url: String,
    pub embed_images: Vec<String>,
    pub embed_caption: Option<String>,
    pub quoted_blocks: Vec<String>,
}

impl NormalizedPost {
    /// Body text plus author attribution, the `data` field of a payload.
    pub fn attributed_text(&self) -> String {
        format!(
            "{}\n\n-- @{} / {}",
            self.body_text, self.author_handle, self.author_display_name
        )
    }
}
