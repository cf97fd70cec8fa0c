use serde::Serialize;

/// Wire record POSTed to the bookmarking endpoint.
///
/// `uri` is the primary reference: the post URL, or the first image URL for
/// a media post (the post URL then moves to `secondary_uri`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPayload {
    pub uri: String,
    /// Body text plus author attribution.
    pub data: String,
    /// Context: source label, original timestamp, embed metadata, thread
    /// excerpt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_uri: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_are_omitted_on_the_wire() {
        let payload = DeliveryPayload {
            uri: "https://bsky.app/profile/alice.test/post/1".into(),
            data: "hello".into(),
            annotation: None,
            secondary_uri: None,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "uri": "https://bsky.app/profile/alice.test/post/1",
                "data": "hello"
            })
        );
    }

    #[test]
    fn test_secondary_uri_is_camel_case() {
        let payload = DeliveryPayload {
            uri: "https://cdn.example/img.jpg".into(),
            data: "hello".into(),
            annotation: Some("From Bluesky".into()),
            secondary_uri: Some("https://bsky.app/profile/alice.test/post/1".into()),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("secondaryUri").is_some());
        assert!(json.get("secondary_uri").is_none());
    }
}
