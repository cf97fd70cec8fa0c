//! Extraction of a post author's own continuation thread.

use chrono::{DateTime, Utc};

use crate::bsky::types::{ThreadElement, ThreadViewPost};

/// One post of the root author's continuation thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadEntry {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Collects the root author's replies to their own post, in chronological
/// order regardless of tree traversal order.
///
/// A reply from anyone else prunes its whole subtree: the own-thread chain is
/// broken at that point, even if the root author replied again further down.
pub fn extract_own_thread(root: &ThreadViewPost) -> Vec<ThreadEntry> {
    let mut entries = Vec::new();
    collect(&root.post.author.did, root, &mut entries);
    entries.sort_by_key(|entry| entry.created_at);
    entries
}

fn collect(author_did: &str, node: &ThreadViewPost, entries: &mut Vec<ThreadEntry>) {
    for reply in node.replies.iter().flatten() {
        let ThreadElement::Post(reply) = reply else {
            continue;
        };
        if reply.post.author.did != author_did {
            continue;
        }
        entries.push(ThreadEntry {
            text: reply.post.record.text.clone(),
            created_at: reply.post.record.created_at,
        });
        collect(author_did, reply, entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn node(did: &str, text: &str, created_at: &str, replies: Vec<Value>) -> Value {
        json!({
            "$type": "app.bsky.feed.defs#threadViewPost",
            "post": {
                "uri": format!("at://{did}/app.bsky.feed.post/{text}"),
                "cid": "cid",
                "author": {"did": did, "handle": "who.test"},
                "record": {"text": text, "createdAt": created_at},
                "indexedAt": created_at
            },
            "replies": replies
        })
    }

    fn thread(value: Value) -> ThreadViewPost {
        serde_json::from_value(value).expect("fixture should deserialize")
    }

    #[test]
    fn test_self_replies_sorted_chronologically() {
        // Tree order T3, T1, T2; a third party interleaves at T1.5 with a
        // self-reply nested only under it.
        let root = thread(node(
            "did:plc:root",
            "root",
            "2024-05-01T10:00:00Z",
            vec![
                node("did:plc:root", "third", "2024-05-01T13:00:00Z", vec![]),
                node(
                    "did:plc:root",
                    "first",
                    "2024-05-01T11:00:00Z",
                    vec![node(
                        "did:plc:other",
                        "interjection",
                        "2024-05-01T11:30:00Z",
                        vec![node(
                            "did:plc:root",
                            "buried",
                            "2024-05-01T11:45:00Z",
                            vec![],
                        )],
                    )],
                ),
                node("did:plc:root", "second", "2024-05-01T12:00:00Z", vec![]),
            ],
        ));

        let entries = extract_own_thread(&root);
        let texts: Vec<&str> = entries
            .iter()
            .map(|e| e.text.as_str())
            .collect();

        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_nested_self_reply_chain_is_flattened() {
        let root = thread(node(
            "did:plc:root",
            "root",
            "2024-05-01T10:00:00Z",
            vec![node(
                "did:plc:root",
                "one",
                "2024-05-01T10:10:00Z",
                vec![node("did:plc:root", "two", "2024-05-01T10:20:00Z", vec![])],
            )],
        ));

        let entries = extract_own_thread(&root);
        let texts: Vec<&str> = entries
            .iter()
            .map(|e| e.text.as_str())
            .collect();

        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn test_no_replies_yields_empty_thread() {
        let root = thread(node("did:plc:root", "root", "2024-05-01T10:00:00Z", vec![]));
        assert!(extract_own_thread(&root).is_empty());
    }

    #[test]
    fn test_only_third_party_replies_yields_empty_thread() {
        let root = thread(node(
            "did:plc:root",
            "root",
            "2024-05-01T10:00:00Z",
            vec![node("did:plc:other", "reply", "2024-05-01T10:10:00Z", vec![])],
        ));
        assert!(extract_own_thread(&root).is_empty());
    }

    #[test]
    fn test_unresolved_thread_elements_are_skipped() {
        let mut root = node("did:plc:root", "root", "2024-05-01T10:00:00Z", vec![]);
        root["replies"] = json!([
            {
                "$type": "app.bsky.feed.defs#notFoundPost",
                "uri": "at://did:plc:gone/app.bsky.feed.post/9",
                "notFound": true
            },
            node("did:plc:root", "still here", "2024-05-01T10:10:00Z", vec![])
        ]);

        let texts: Vec<String> = extract_own_thread(&thread(root))
            .into_iter()
            .map(|e| e.text)
            .collect();

        assert_eq!(texts, vec!["still here"]);
    }
}
