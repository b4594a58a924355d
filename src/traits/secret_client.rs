//! Secret client trait for the remote store/retrieve protocol

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::ItemName;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout")]
    Timeout,
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Rejected by service (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Another operation is still in progress")]
    Busy,
}

/// Coarse failure classification surfaced to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TransportError,
    RemoteRejected,
    Busy,
}

impl SecretError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SecretError::Network(_)
            | SecretError::Timeout
            | SecretError::MalformedResponse(_)
            | SecretError::InvalidUrl(_) => ErrorKind::TransportError,
            SecretError::Rejected { .. } => ErrorKind::RemoteRejected,
            SecretError::Busy => ErrorKind::Busy,
        }
    }

    /// Text shown to the user. Service-supplied messages pass through verbatim.
    pub fn detail(&self) -> String {
        match self {
            SecretError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// A secret to store, keyed remotely by `(username, item)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub username: String,
    pub item: ItemName,
    pub value: String,
}

impl SecretRecord {
    pub fn new(username: impl Into<String>, item: ItemName, value: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            item,
            value: value.into(),
        }
    }

    pub fn key(&self) -> SecretKey {
        SecretKey {
            username: self.username.clone(),
            item: self.item.clone(),
        }
    }
}

/// Lookup key for a retrieve request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretKey {
    pub username: String,
    pub item: ItemName,
}

impl SecretKey {
    pub fn new(username: impl Into<String>, item: ItemName) -> Self {
        Self {
            username: username.into(),
            item,
        }
    }
}

/// Typed outcome of one store or retrieve attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationResult {
    Success { value: Option<String> },
    Failure { reason: ErrorKind, detail: String },
}

impl OperationResult {
    pub fn failure(error: &SecretError) -> Self {
        OperationResult::Failure {
            reason: error.kind(),
            detail: error.detail(),
        }
    }

    pub fn from_store(result: Result<(), SecretError>) -> Self {
        match result {
            Ok(()) => OperationResult::Success { value: None },
            Err(e) => Self::failure(&e),
        }
    }

    pub fn from_retrieve(result: Result<String, SecretError>) -> Self {
        match result {
            Ok(value) => OperationResult::Success { value: Some(value) },
            Err(e) => Self::failure(&e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success { .. })
    }

    pub fn reason(&self) -> Option<ErrorKind> {
        match self {
            OperationResult::Success { .. } => None,
            OperationResult::Failure { reason, .. } => Some(*reason),
        }
    }
}

/// Trait for the remote secret service
///
/// Production: reqwest HTTP client
/// Testing: In-memory service and recorded responses
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SecretClient: Send + Sync {
    /// Store a secret. Exactly one request per call, never retried.
    async fn store(&self, record: &SecretRecord) -> Result<(), SecretError>;

    /// Retrieve the value stored under `key`
    async fn retrieve(&self, key: &SecretKey) -> Result<String, SecretError>;
}
