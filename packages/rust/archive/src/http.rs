//! HTTP implementation of [`ArchiveClient`] against the archive's search API.

use std::time::Duration;

use contextpairs_shared::{ArchiveConfig, Comment, ContextPairsError, Result, Submission};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::ArchiveClient;
use crate::gate::RequestGate;

/// User-Agent string for archive requests.
const USER_AGENT: &str = concat!("contextpairs/", env!("CARGO_PKG_VERSION"));

/// Fields requested for submissions.
const SUBMISSION_FIELDS: &str = "selftext,title";

/// Envelope shared by both search endpoints: `{"data": [...]}`.
#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    data: Option<Vec<T>>,
}

/// Archive client speaking `GET /comment/search` and `GET /search/submission/`.
pub struct HttpArchiveClient {
    client: Client,
    base_url: String,
    gate: RequestGate,
}

impl HttpArchiveClient {
    /// Build a client from runtime config.
    pub fn new(config: &ArchiveConfig) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|e| {
            ContextPairsError::config(format!("invalid archive URL '{}': {e}", config.base_url))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ContextPairsError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            gate: RequestGate::new(Duration::from_millis(config.min_interval_ms)),
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}/{path}", self.base_url);
        Url::parse_with_params(&raw, params)
            .map_err(|e| ContextPairsError::validation(format!("bad archive URL {raw}: {e}")))
    }

    /// Fetch an endpoint and return the first element of its `data` array.
    async fn first_match<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        self.gate.wait().await;
        debug!(%url, "archive request");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ContextPairsError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContextPairsError::Network(format!("{url}: HTTP {status}")));
        }

        let body: SearchResponse<T> = response
            .json()
            .await
            .map_err(|e| ContextPairsError::parse(format!("{url}: {e}")))?;

        Ok(body.data.unwrap_or_default().into_iter().next())
    }
}

impl ArchiveClient for HttpArchiveClient {
    async fn fetch_comment(&self, id: &str) -> Result<Option<Comment>> {
        let url = self.endpoint("comment/search", &[("ids", id)])?;
        self.first_match(url).await
    }

    async fn fetch_submission(&self, id: &str) -> Result<Option<Submission>> {
        let url = self.endpoint(
            "search/submission/",
            &[("ids", id), ("fields", SUBMISSION_FIELDS)],
        )?;
        self.first_match(url).await
    }
}
