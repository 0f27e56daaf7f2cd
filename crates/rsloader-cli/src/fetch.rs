//! HTTP batch fetch function for JSONPlaceholder-style REST APIs.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use rsloader_core::BatchFn;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ApiSettings;

/// Errors from fetching a single item.
#[derive(Debug, Error)]
pub enum HttpFetchError {
    /// The request could not be sent or its body could not be decoded.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Loads items by id from `{base_url}/{resource}/{id}`.
///
/// The API has no bulk endpoint, so a batch issues one GET per key
/// concurrently. A failed GET fails only its own key.
#[derive(Debug, Clone)]
pub struct HttpBatchFn {
    client: Client,
    base_url: String,
    resource: String,
}

impl HttpBatchFn {
    /// Creates a fetcher for `resource` under `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        resource: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, HttpFetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(HttpFetchError::Client)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            resource: resource.into(),
        })
    }

    /// Creates a fetcher from the `api` section of the configuration.
    pub fn from_settings(settings: &ApiSettings) -> Result<Self, HttpFetchError> {
        Self::new(
            settings.base_url.as_str(),
            settings.resource.as_str(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    /// Returns the URL of the item with the given id.
    pub fn item_url(&self, id: u64) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.resource.trim_matches('/'),
            id
        )
    }

    async fn fetch_one(&self, id: u64) -> Result<Value, HttpFetchError> {
        let url = self.item_url(id);
        debug!(%url, "fetching item");

        let request_error = |source: reqwest::Error| HttpFetchError::Request {
            url: url.clone(),
            source,
        };
        let response = self.client.get(&url).send().await.map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpFetchError::Status {
                url: url.clone(),
                status,
            });
        }

        response.json::<Value>().await.map_err(request_error)
    }
}

#[async_trait]
impl BatchFn<u64, Value> for HttpBatchFn {
    type Error = HttpFetchError;

    async fn load(
        &self,
        keys: &[u64],
    ) -> Result<Vec<Result<Value, HttpFetchError>>, HttpFetchError> {
        let results = join_all(keys.iter().map(|&id| self.fetch_one(id))).await;

        for (id, result) in keys.iter().zip(&results) {
            if let Err(err) = result {
                warn!(id, error = %err, "failed to fetch item");
            }
        }

        Ok(results)
    }
}
