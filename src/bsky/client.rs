//! XRPC client for the feed source.
//!
//! Authed requests retry exactly once after a transparent token refresh;
//! every refresh is queued as a [`SessionEvent`] for the host to persist.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use crate::app::{Result, SkymarkError};
use crate::bsky::session::{Session, SessionEvent};
use crate::bsky::types::{AuthorFeed, GetPostThreadOutput, ThreadElement, ThreadViewPost};
use crate::fetcher::FeedSource;

pub struct BskyClient {
    http: Client,
    service: Url,
    session: Mutex<Option<Session>>,
    events: Mutex<Vec<SessionEvent>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionInput<'a> {
    identifier: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_factor_token: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct XrpcErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl BskyClient {
    pub fn new(service: Url) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("skymark/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            service,
            session: Mutex::new(None),
            events: Mutex::new(Vec::new()),
        }
    }

    fn xrpc(&self, nsid: &str) -> Result<Url> {
        Ok(self.service.join(&format!("xrpc/{nsid}"))?)
    }

    /// Signs in. A failed second factor surfaces as
    /// [`SkymarkError::AuthFactorRequired`]; the caller decides whether to
    /// prompt for the emailed code and resubmit.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        auth_factor_token: Option<&str>,
    ) -> Result<Session> {
        let response = self
            .http
            .post(self.xrpc("com.atproto.server.createSession")?)
            .json(&CreateSessionInput {
                identifier,
                password,
                auth_factor_token,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let session: Session = response.json().await?;
        *self.session.lock().await = Some(session.clone());
        Ok(session)
    }

    /// Adopts a previously persisted session.
    pub async fn resume(&self, session: Session) {
        *self.session.lock().await = Some(session);
    }

    pub async fn has_session(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// DID of the active session, the `actor` for feed requests.
    pub async fn session_did(&self) -> Option<String> {
        self.session.lock().await.as_ref().map(|s| s.did.clone())
    }

    /// Session refreshes recorded since the last drain. The caller persists
    /// each through the durable store.
    pub async fn drain_session_events(&self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.events.lock().await)
    }

    async fn refresh(&self) -> Result<Session> {
        let refresh_jwt = self
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| s.refresh_jwt.clone())
            .ok_or_else(|| SkymarkError::Auth("no session to refresh".into()))?;

        let response = self
            .http
            .post(self.xrpc("com.atproto.server.refreshSession")?)
            .bearer_auth(&refresh_jwt)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let session: Session = response.json().await?;
        *self.session.lock().await = Some(session.clone());
        self.events
            .lock()
            .await
            .push(SessionEvent::Refreshed(session.clone()));
        Ok(session)
    }

    async fn access_token(&self) -> Result<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.access_jwt.clone())
            .ok_or_else(|| SkymarkError::Auth("not signed in".into()))
    }

    async fn authed_get<T: DeserializeOwned>(
        &self,
        nsid: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        match self.try_get(nsid, query).await {
            Err(SkymarkError::ExpiredSession) => {
                self.refresh().await?;
                self.try_get(nsid, query).await
            }
            result => result,
        }
    }

    async fn try_get<T: DeserializeOwned>(
        &self,
        nsid: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http
            .get(self.xrpc(nsid)?)
            .query(query)
            .bearer_auth(self.access_token().await?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(response.json().await?)
    }

    async fn error_from(response: Response) -> SkymarkError {
        let status = response.status();
        let reset = response
            .headers()
            .get("ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok());
        let body: XrpcErrorBody = response.json().await.unwrap_or_default();

        classify_error(status, reset, Utc::now().timestamp(), body)
    }
}

fn classify_error(
    status: StatusCode,
    ratelimit_reset: Option<i64>,
    now: i64,
    body: XrpcErrorBody,
) -> SkymarkError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let minutes = ratelimit_reset.map_or(5, |reset| minutes_until(reset, now));
        return SkymarkError::RateLimitedLogin { minutes };
    }

    match body.error.as_deref() {
        Some("AuthFactorTokenRequired") => SkymarkError::AuthFactorRequired,
        Some("ExpiredToken") => SkymarkError::ExpiredSession,
        _ => SkymarkError::Bsky {
            status: status.as_u16(),
            message: body
                .message
                .or(body.error)
                .unwrap_or_else(|| "unknown error".into()),
        },
    }
}

/// Whole minutes until the given unix timestamp, at least one.
fn minutes_until(reset: i64, now: i64) -> i64 {
    (((reset - now).max(0) + 59) / 60).max(1)
}

#[async_trait]
impl FeedSource for BskyClient {
    async fn likes_page(
        &self,
        actor: &str,
        limit: u8,
        cursor: Option<&str>,
    ) -> Result<AuthorFeed> {
        let mut query = vec![("actor", actor.to_string()), ("limit", limit.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        self.authed_get("app.bsky.feed.getActorLikes", &query).await
    }

    async fn post_thread(&self, uri: &str, depth: usize) -> Result<ThreadViewPost> {
        let output: GetPostThreadOutput = self
            .authed_get(
                "app.bsky.feed.getPostThread",
                &[("uri", uri.to_string()), ("depth", depth.to_string())],
            )
            .await?;

        match output.thread {
            ThreadElement::Post(thread) => Ok(thread),
            ThreadElement::NotFound(post) => Err(SkymarkError::Bsky {
                status: 404,
                message: format!("post not found: {}", post.uri),
            }),
            ThreadElement::Blocked(post) => Err(SkymarkError::Bsky {
                status: 403,
                message: format!("post blocked: {}", post.uri),
            }),
            ThreadElement::Unsupported(_) => Err(SkymarkError::Bsky {
                status: 500,
                message: format!("unrecognized thread root for {uri}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(error: Option<&str>, message: Option<&str>) -> XrpcErrorBody {
        XrpcErrorBody {
            error: error.map(String::from),
            message: message.map(String::from),
        }
    }

    #[test]
    fn test_auth_factor_challenge_is_classified() {
        let err = classify_error(
            StatusCode::UNAUTHORIZED,
            None,
            0,
            body(Some("AuthFactorTokenRequired"), Some("check your email")),
        );
        assert!(matches!(err, SkymarkError::AuthFactorRequired));
    }

    #[test]
    fn test_expired_token_is_classified() {
        let err = classify_error(
            StatusCode::BAD_REQUEST,
            None,
            0,
            body(Some("ExpiredToken"), None),
        );
        assert!(matches!(err, SkymarkError::ExpiredSession));
    }

    #[test]
    fn test_rate_limit_computes_wait_minutes() {
        let err = classify_error(
            StatusCode::TOO_MANY_REQUESTS,
            Some(1_700_000_121),
            1_700_000_000,
            body(Some("RateLimitExceeded"), None),
        );
        assert!(matches!(err, SkymarkError::RateLimitedLogin { minutes: 3 }));
    }

    #[test]
    fn test_rate_limit_without_reset_header_uses_fallback() {
        let err = classify_error(
            StatusCode::TOO_MANY_REQUESTS,
            None,
            1_700_000_000,
            body(None, None),
        );
        assert!(matches!(err, SkymarkError::RateLimitedLogin { minutes: 5 }));
    }

    #[test]
    fn test_other_errors_keep_status_and_message() {
        let err = classify_error(
            StatusCode::BAD_GATEWAY,
            None,
            0,
            body(Some("UpstreamFailure"), None),
        );
        match err {
            SkymarkError::Bsky { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "UpstreamFailure");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_minutes_until_rounds_up_and_floors_at_one() {
        assert_eq!(minutes_until(1_000_120, 1_000_000), 2);
        assert_eq!(minutes_until(1_000_121, 1_000_000), 3);
        assert_eq!(minutes_until(1_000_030, 1_000_000), 1);
        assert_eq!(minutes_until(999_000, 1_000_000), 1);
    }
}
