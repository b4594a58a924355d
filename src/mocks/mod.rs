//! Test doubles for dependency injection
//!
//! In-memory stand-ins for the remote secret service, for isolated testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::traits::{SecretClient, SecretError, SecretKey, SecretRecord};

// ============================================================================
// InMemorySecretService
// ============================================================================

/// Well-behaved remote service stub
///
/// Keeps secrets in a HashMap keyed by `(username, item)`. Unknown keys are
/// rejected the way the real service does, with a plain error message.
#[derive(Clone, Default)]
pub struct InMemorySecretService {
    secrets: Arc<Mutex<HashMap<SecretKey, String>>>,
    call_count: Arc<Mutex<usize>>,
    strict: bool,
}

impl InMemorySecretService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service that rejects empty usernames and values, like a validating backend
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Get the stored value for a key (for assertions)
    pub fn get(&self, key: &SecretKey) -> Option<String> {
        self.secrets.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.secrets.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get number of calls made
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    fn count_call(&self) {
        *self.call_count.lock().unwrap() += 1;
    }
}

#[async_trait]
impl SecretClient for InMemorySecretService {
    async fn store(&self, record: &SecretRecord) -> Result<(), SecretError> {
        self.count_call();
        if self.strict && (record.username.is_empty() || record.value.is_empty()) {
            return Err(SecretError::Rejected {
                status: 400,
                message: "username and value are required".to_string(),
            });
        }
        self.secrets
            .lock()
            .unwrap()
            .insert(record.key(), record.value.clone());
        Ok(())
    }

    async fn retrieve(&self, key: &SecretKey) -> Result<String, SecretError> {
        self.count_call();
        self.secrets
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| SecretError::Rejected {
                status: 404,
                message: "Secret not found".to_string(),
            })
    }
}

// ============================================================================
// RecordedSecretClient
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRequest {
    Store(SecretRecord),
    Retrieve(SecretKey),
}

impl SecretRequest {
    pub fn item(&self) -> &str {
        match self {
            SecretRequest::Store(record) => record.item.as_str(),
            SecretRequest::Retrieve(key) => key.item.as_str(),
        }
    }
}

type Responder = Arc<dyn Fn(&SecretRequest) -> Result<String, SecretError> + Send + Sync>;

/// Response configuration for the recorded client
#[derive(Clone)]
pub enum SecretBehavior {
    /// Succeed; retrieves return the given value
    AlwaysSucceed(String),
    /// Always fail with given error
    AlwaysFail(SecretError),
    /// Custom response based on request. Store calls discard the `Ok` value.
    Custom(Responder),
}

/// Recorded secret client for testing
///
/// Records all requests and provides configurable responses. A gated client
/// holds every call in flight until [`RecordedSecretClient::release`] is called.
#[derive(Clone)]
pub struct RecordedSecretClient {
    requests: Arc<Mutex<Vec<SecretRequest>>>,
    behavior: Arc<Mutex<SecretBehavior>>,
    gate: Option<Arc<Semaphore>>,
}

impl RecordedSecretClient {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            behavior: Arc::new(Mutex::new(SecretBehavior::AlwaysSucceed(String::new()))),
            gate: None,
        }
    }

    /// Always succeed; retrieves return `value`
    pub fn success(value: &str) -> Self {
        let client = Self::new();
        client.set_behavior(SecretBehavior::AlwaysSucceed(value.to_string()));
        client
    }

    /// Always fail with given error
    pub fn always_fail(error: SecretError) -> Self {
        let client = Self::new();
        client.set_behavior(SecretBehavior::AlwaysFail(error));
        client
    }

    /// Succeed with `value`, but only once a permit has been released
    pub fn gated(value: &str) -> Self {
        let mut client = Self::success(value);
        client.gate = Some(Arc::new(Semaphore::new(0)));
        client
    }

    /// Let `calls` held requests complete
    pub fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    /// Set the behavior for subsequent calls
    pub fn set_behavior(&self, behavior: SecretBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Get all recorded requests
    pub fn requests(&self) -> Vec<SecretRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Get number of calls made
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Record a request, wait for the gate, and determine the response
    async fn record_and_respond(&self, request: SecretRequest) -> Result<String, SecretError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            SecretBehavior::AlwaysSucceed(value) => Ok(value),
            SecretBehavior::AlwaysFail(error) => Err(error),
            SecretBehavior::Custom(func) => func(&request),
        }
    }
}

impl Default for RecordedSecretClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretClient for RecordedSecretClient {
    async fn store(&self, record: &SecretRecord) -> Result<(), SecretError> {
        self.record_and_respond(SecretRequest::Store(record.clone()))
            .await
            .map(|_| ())
    }

    async fn retrieve(&self, key: &SecretKey) -> Result<String, SecretError> {
        self.record_and_respond(SecretRequest::Retrieve(key.clone())).await
    }
}

// ============================================================================
// Tests
// ============================================================================
