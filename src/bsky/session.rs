//! Session material and its persistence through the durable store.

use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::store::Store;

/// Authenticated session returned by createSession/refreshSession.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
    pub refresh_jwt: String,
}

/// A session change the host loop must persist. Surfaced as an explicit
/// event rather than a callback holding a store handle.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Refreshed(Session),
}

pub fn session_key(namespace: &str) -> String {
    format!("{namespace}:session")
}

pub fn seen_key(namespace: &str) -> String {
    format!("{namespace}:seen")
}

pub fn load_session(store: &dyn Store, namespace: &str) -> Result<Option<Session>> {
    match store.get(&session_key(namespace))? {
        Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
        None => Ok(None),
    }
}

pub fn save_session(store: &dyn Store, namespace: &str, session: &Session) -> Result<()> {
    store.set(&session_key(namespace), &serde_json::to_string(session)?)
}

pub fn clear_session(store: &dyn Store, namespace: &str) -> Result<()> {
    store.del(&session_key(namespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn session() -> Session {
        Session {
            did: "did:plc:me".into(),
            handle: "me.test".into(),
            access_jwt: "access".into(),
            refresh_jwt: "refresh".into(),
        }
    }

    #[test]
    fn test_session_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();

        assert_eq!(load_session(&store, "me.test").unwrap(), None);

        save_session(&store, "me.test", &session()).unwrap();
        assert_eq!(load_session(&store, "me.test").unwrap(), Some(session()));

        clear_session(&store, "me.test").unwrap();
        assert_eq!(load_session(&store, "me.test").unwrap(), None);
    }

    #[test]
    fn test_sessions_are_namespaced_per_identity() {
        let store = SqliteStore::in_memory().unwrap();

        save_session(&store, "me.test", &session()).unwrap();
        assert_eq!(load_session(&store, "other.test").unwrap(), None);
    }

    #[test]
    fn test_store_keys_are_namespaced() {
        assert_eq!(session_key("me.test"), "me.test:session");
        assert_eq!(seen_key("me.test"), "me.test:seen");
    }
}
