//! Conditional fetch of the restaurant feed.
//!
//! A single remote resource is fetched with HTTP conditional-caching
//! semantics: the persisted `Last-Modified` value of the previous good
//! response is replayed as `If-Modified-Since`, and a 304 answer is
//! classified as [`FetchOutcome::NotModified`] without downloading a body.
//! Failures are never retried here; a reload is always caller-driven.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};

use crate::cache::{CacheStore, FetchRunOutcome};

use super::error::FeedError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const IF_MODIFIED_SINCE: &str = "If-Modified-Since";
const LAST_MODIFIED: &str = "Last-Modified";

/// Classified result of one fetch attempt. Exactly one case holds.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The server returned a new body; the validator and payload copy have
    /// already been persisted.
    Fresh(Vec<u8>),
    /// The server answered 304 for our validator.
    NotModified,
    /// Transport error or unexpected status; the validator has been cleared
    /// so the next attempt is unconditional.
    Failed(FeedError),
}

/// Seam between the orchestrator and the network, so tests can script
/// outcomes without a socket.
#[async_trait::async_trait]
pub trait FeedGateway: Send + Sync {
    async fn fetch(&self) -> FetchOutcome;
}

/// Fetches the feed over HTTPS and keeps the cache store in sync with what
/// the server told us.
pub struct FeedFetcher {
    client: Client,
    url: Url,
    cache: Arc<dyn CacheStore>,
    /// When false the stored validator is ignored and the request is
    /// unconditional (the `--full` escape hatch).
    conditional: bool,
}

impl FeedFetcher {
    pub fn new(
        url: Url,
        cache: Arc<dyn CacheStore>,
        conditional: bool,
    ) -> Result<Self, FeedError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url,
            cache,
            conditional,
        })
    }

    async fn try_fetch(&self) -> Result<FetchOutcome, FeedError> {
        let mut request = self.client.get(self.url.clone());

        if self.conditional {
            if let Some(validator) = self.cache.validator().await? {
                tracing::debug!(%validator, "issuing conditional fetch");
                request = request.header(IF_MODIFIED_SINCE, validator);
            }
        }

        let response = request.send().await?;

        if response.status() == StatusCode::NOT_MODIFIED {
            tracing::debug!("feed not modified since last fetch");
            self.record(FetchRunOutcome::NotModified, None).await;
            return Ok(FetchOutcome::NotModified);
        }

        if !response.status().is_success() {
            return Err(FeedError::Status {
                status: response.status().as_u16(),
                url: self.url.to_string(),
            });
        }

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let bytes = response.bytes().await?.to_vec();

        // The original only overwrites the validator when the header is
        // present, so a response without one leaves the old value standing.
        if let Some(validator) = &last_modified {
            self.cache.set_validator(validator).await?;
        }
        self.cache.write_payload(&bytes).await?;

        tracing::info!(
            bytes = bytes.len(),
            validator = last_modified.as_deref().unwrap_or("<none>"),
            "downloaded fresh feed"
        );
        self.record(FetchRunOutcome::Fresh, None).await;
        Ok(FetchOutcome::Fresh(bytes))
    }

    /// Fetch-run bookkeeping is best-effort; a logging failure must not turn
    /// a good fetch into a bad one.
    async fn record(&self, outcome: FetchRunOutcome, detail: Option<&str>) {
        if let Err(err) = self.cache.record_fetch(outcome, detail).await {
            tracing::warn!(error = %err, "failed to record fetch run");
        }
    }
}

#[async_trait::async_trait]
impl FeedGateway for FeedFetcher {
    async fn fetch(&self) -> FetchOutcome {
        match self.try_fetch().await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = %err, "feed fetch failed");
                if let Err(clear_err) = self.cache.clear_validator().await {
                    tracing::warn!(error = %clear_err, "failed to clear stored validator");
                }
                self.record(FetchRunOutcome::Failed, Some(&err.to_string()))
                    .await;
                FetchOutcome::Failed(err)
            }
        }
    }
}
