//! Signed delivery to the downstream bookmarking endpoint.

pub mod signing;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, StatusCode};
use url::Url;

use crate::app::Result;
use crate::domain::DeliveryPayload;

pub use signing::Signer;

const SIGNATURE_HEADER: &str = "X-Signature";

/// What the endpoint said about one request. Success is exactly HTTP 204;
/// everything else is a rejection the caller retries next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Accepted,
    Rejected(u16),
}

#[async_trait]
pub trait Bookmarker: Send + Sync {
    /// Hands one payload to the endpoint.
    async fn deliver(&self, payload: &DeliveryPayload) -> Result<DeliveryOutcome>;

    /// Signed no-op request to verify endpoint reachability and the secret.
    async fn ping(&self) -> Result<DeliveryOutcome>;
}

pub struct HttpBookmarker {
    http: Client,
    endpoint: Url,
    signer: Signer,
}

impl HttpBookmarker {
    pub fn new(endpoint: Url, signer: Signer) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("skymark/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            endpoint,
            signer,
        }
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        Ok(self.endpoint.join(path)?)
    }

    fn outcome(status: StatusCode) -> DeliveryOutcome {
        if status == StatusCode::NO_CONTENT {
            DeliveryOutcome::Accepted
        } else {
            DeliveryOutcome::Rejected(status.as_u16())
        }
    }
}

#[async_trait]
impl Bookmarker for HttpBookmarker {
    async fn deliver(&self, payload: &DeliveryPayload) -> Result<DeliveryOutcome> {
        let body = serde_json::to_vec(payload)?;
        let signature = self.signer.sign(&body);

        let response = self
            .http
            .post(self.api_url("api/bookmarks")?)
            .header(SIGNATURE_HEADER, signature)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        Ok(Self::outcome(response.status()))
    }

    async fn ping(&self) -> Result<DeliveryOutcome> {
        let (query, signature) = self.signer.signed_query("", Utc::now().timestamp());
        let mut url = self.api_url("api/ping")?;
        url.set_query(Some(&query));

        let response = self
            .http
            .get(url)
            .header(SIGNATURE_HEADER, signature)
            .send()
            .await?;

        Ok(Self::outcome(response.status()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_204_is_accepted() {
        assert_eq!(
            HttpBookmarker::outcome(StatusCode::NO_CONTENT),
            DeliveryOutcome::Accepted
        );
        assert_eq!(
            HttpBookmarker::outcome(StatusCode::OK),
            DeliveryOutcome::Rejected(200)
        );
        assert_eq!(
            HttpBookmarker::outcome(StatusCode::UNAUTHORIZED),
            DeliveryOutcome::Rejected(401)
        );
        assert_eq!(
            HttpBookmarker::outcome(StatusCode::INTERNAL_SERVER_ERROR),
            DeliveryOutcome::Rejected(500)
        );
    }
}
