//! Reqwest-based secret client implementation

use std::time::Instant;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::config::{ClientConfig, RETRIEVE_PATH, STORE_PATH};
use crate::traits::{SecretClient, SecretError, SecretKey, SecretRecord};

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

pub struct ReqwestSecretClient {
    client: Client,
    store_url: Url,
    retrieve_url: Url,
}

impl ReqwestSecretClient {
    pub fn new(config: &ClientConfig) -> Result<Self, SecretError> {
        let store_url = config.endpoint(STORE_PATH)?;
        let retrieve_url = config.endpoint(RETRIEVE_PATH)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SecretError::Network(e.to_string()))?;

        tracing::debug!(
            base_url = %config.base_url,
            timeout_secs = config.timeout.as_secs(),
            "Initialized secret client"
        );
        Ok(Self {
            client,
            store_url,
            retrieve_url,
        })
    }

    /// POST a JSON body and return the status and raw response text.
    /// Any status is returned as-is; only transport failures are errors here.
    async fn post<T: Serialize + Sync>(&self, url: &Url, body: &T) -> Result<(u16, String), SecretError> {
        let start = Instant::now();

        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| transport_error(url, e))?;

        tracing::debug!(
            url = %url,
            status,
            duration_ms = start.elapsed().as_millis() as u64,
            "Secret service responded"
        );
        Ok((status, text))
    }
}

fn transport_error(url: &Url, e: reqwest::Error) -> SecretError {
    if e.is_timeout() {
        tracing::warn!(url = %url, "Secret service timeout");
        SecretError::Timeout
    } else {
        let detail = error_chain(&e);
        tracing::warn!(url = %url, error = %detail, "Secret service unreachable");
        SecretError::Network(detail)
    }
}

/// Error message followed by each underlying cause, joined with ": "
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut detail = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

/// Turn a non-2xx response into an error. The service answers `{error}`;
/// a body that is not JSON at all is a malformed response.
fn rejection(status: u16, body: &str) -> SecretError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse { error: Some(message) }) => SecretError::Rejected { status, message },
        Ok(ErrorResponse { error: None }) => SecretError::Rejected {
            status,
            message: format!("HTTP {}", status),
        },
        Err(e) => SecretError::MalformedResponse(format!("HTTP {}: {}", status, e)),
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[async_trait::async_trait]
impl SecretClient for ReqwestSecretClient {
    async fn store(&self, record: &SecretRecord) -> Result<(), SecretError> {
        tracing::info!(username = %record.username, item = %record.item, "Storing secret");

        let (status, body) = self.post(&self.store_url, record).await?;
        if !is_success(status) {
            let err = rejection(status, &body);
            tracing::warn!(item = %record.item, status, error = %err, "Store rejected");
            return Err(err);
        }
        Ok(())
    }

    async fn retrieve(&self, key: &SecretKey) -> Result<String, SecretError> {
        tracing::info!(username = %key.username, item = %key.item, "Retrieving secret");

        let (status, body) = self.post(&self.retrieve_url, key).await?;
        if !is_success(status) {
            let err = rejection(status, &body);
            tracing::warn!(item = %key.item, status, error = %err, "Retrieve rejected");
            return Err(err);
        }

        serde_json::from_str::<RetrieveResponse>(&body)
            .map(|r| r.value)
            .map_err(|e| SecretError::MalformedResponse(e.to_string()))
    }
}
