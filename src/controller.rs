//! Per-item store/retrieve state machine
//!
//! One `OperationController` backs one item's form. It holds the user's
//! in-progress input, runs at most one remote call at a time, and records the
//! outcome as an explicit `ControllerState`.
//!
//! ```text
//! Idle | Succeeded | Failed --submit--> Pending --ok--> Succeeded
//!                                               \-err--> Failed
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::catalog::{ItemDefinition, ItemName};
use crate::password;
use crate::traits::{ErrorKind, OperationResult, SecretClient, SecretError, SecretKey, SecretRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Snapshot of one controller's form state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ControllerState {
    pub username: String,
    pub pending_value: String,
    pub status: OperationStatus,
    pub last_message: Option<String>,
    pub last_retrieved_value: Option<String>,
    /// Unix timestamp of the last status change
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Store,
    Retrieve,
}

impl Operation {
    fn label(&self) -> &'static str {
        match self {
            Operation::Store => "store",
            Operation::Retrieve => "retrieve",
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            Operation::Store => "Stored successfully",
            Operation::Retrieve => "Retrieved successfully",
        }
    }

    fn error_prefix(&self) -> &'static str {
        match self {
            Operation::Store => "Store error",
            Operation::Retrieve => "Retrieve error",
        }
    }
}

pub struct OperationController {
    item: ItemDefinition,
    client: Arc<dyn SecretClient>,
    state: Arc<Mutex<ControllerState>>,
}

impl OperationController {
    pub fn new(item: ItemDefinition, client: Arc<dyn SecretClient>) -> Self {
        Self {
            item,
            client,
            state: Arc::new(Mutex::new(ControllerState::default())),
        }
    }

    pub fn item(&self) -> &ItemDefinition {
        &self.item
    }

    pub fn state(&self) -> ControllerState {
        self.lock().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().status == OperationStatus::Pending
    }

    pub fn set_username(&self, username: impl Into<String>) {
        self.lock().username = username.into();
    }

    pub fn set_pending_value(&self, value: impl Into<String>) {
        self.lock().pending_value = value.into();
    }

    /// Replace the pending value with a freshly generated password and return it
    pub fn fill_generated_password(&self) -> String {
        let generated = password::generate_password();
        self.lock().pending_value = generated.clone();
        generated
    }

    /// Store `value` for `username` under this controller's item.
    ///
    /// The remote call runs on its own task. Dropping the returned future
    /// does not abort it; the outcome still lands in the controller's state.
    pub async fn submit_store(&self, username: impl Into<String>, value: impl Into<String>) -> OperationResult {
        let username = username.into();
        let value = value.into();

        let attempt = match self.begin(Operation::Store, &username, Some(&value)) {
            Ok(attempt) => attempt,
            Err(e) => return OperationResult::failure(&e),
        };

        let record = SecretRecord::new(username, self.item.name.clone(), value);
        let client = Arc::clone(&self.client);
        let task = tokio::spawn(async move {
            let result = OperationResult::from_store(client.store(&record).await);
            attempt.finish(result)
        });
        join_attempt(task).await
    }

    /// Retrieve the value stored for `username` under this controller's item
    pub async fn submit_retrieve(&self, username: impl Into<String>) -> OperationResult {
        let username = username.into();

        let attempt = match self.begin(Operation::Retrieve, &username, None) {
            Ok(attempt) => attempt,
            Err(e) => return OperationResult::failure(&e),
        };

        let key = SecretKey::new(username, self.item.name.clone());
        let client = Arc::clone(&self.client);
        let task = tokio::spawn(async move {
            let result = OperationResult::from_retrieve(client.retrieve(&key).await);
            attempt.finish(result)
        });
        join_attempt(task).await
    }

    /// Store using the username and value currently held in the form
    pub async fn submit_pending_store(&self) -> OperationResult {
        let (username, value) = {
            let state = self.lock();
            (state.username.clone(), state.pending_value.clone())
        };
        self.submit_store(username, value).await
    }

    /// Retrieve using the username currently held in the form
    pub async fn submit_pending_retrieve(&self) -> OperationResult {
        let username = self.lock().username.clone();
        self.submit_retrieve(username).await
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        lock_state(&self.state)
    }

    /// Move to Pending, or refuse with `Busy` if a call is already in flight
    fn begin(&self, operation: Operation, username: &str, value: Option<&str>) -> Result<PendingAttempt, SecretError> {
        let mut state = self.lock();
        if state.status == OperationStatus::Pending {
            tracing::warn!(
                item = %self.item.name,
                operation = operation.label(),
                "Rejected submission while another operation is pending"
            );
            return Err(SecretError::Busy);
        }

        state.username = username.to_string();
        if let Some(value) = value {
            state.pending_value = value.to_string();
        }
        state.status = OperationStatus::Pending;
        state.updated_at = Some(chrono::Utc::now().timestamp());

        let id = Uuid::new_v4();
        tracing::info!(
            attempt = %id,
            item = %self.item.name,
            username = %username,
            operation = operation.label(),
            "Submitting secret operation"
        );

        Ok(PendingAttempt {
            state: Arc::downgrade(&self.state),
            item: self.item.name.clone(),
            operation,
            id,
            settled: false,
        })
    }
}

fn lock_state(state: &Mutex<ControllerState>) -> MutexGuard<'_, ControllerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn join_attempt(task: JoinHandle<OperationResult>) -> OperationResult {
    match task.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Secret operation task did not complete");
            OperationResult::Failure {
                reason: ErrorKind::TransportError,
                detail: format!("Operation aborted: {}", e),
            }
        }
    }
}

/// An in-flight attempt, owned by the task running the remote call.
///
/// Holds only a weak handle: once the controller is dropped the outcome is
/// discarded. Dropped unsettled (the task panicked or the runtime shut down),
/// it puts a still-living controller back to Idle.
struct PendingAttempt {
    state: Weak<Mutex<ControllerState>>,
    item: ItemName,
    operation: Operation,
    id: Uuid,
    settled: bool,
}

impl PendingAttempt {
    fn finish(mut self, result: OperationResult) -> OperationResult {
        self.settled = true;
        let Some(shared) = self.state.upgrade() else {
            tracing::debug!(attempt = %self.id, item = %self.item, "Controller discarded before the result arrived");
            return result;
        };
        let mut state = lock_state(&shared);
        state.updated_at = Some(chrono::Utc::now().timestamp());

        match &result {
            OperationResult::Success { value } => {
                tracing::info!(attempt = %self.id, item = %self.item, operation = self.operation.label(), "Secret operation succeeded");
                state.status = OperationStatus::Succeeded;
                state.last_message = Some(self.operation.success_message().to_string());
                if self.operation == Operation::Retrieve {
                    state.last_retrieved_value = value.clone();
                }
            }
            OperationResult::Failure { reason, detail } => {
                tracing::warn!(
                    attempt = %self.id,
                    item = %self.item,
                    operation = self.operation.label(),
                    reason = ?reason,
                    detail = %detail,
                    "Secret operation failed"
                );
                state.status = OperationStatus::Failed;
                state.last_message = Some(format!("{}: {}", self.operation.error_prefix(), detail));
                if self.operation == Operation::Retrieve {
                    state.last_retrieved_value = None;
                }
            }
        }

        result
    }
}

impl Drop for PendingAttempt {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::debug!(attempt = %self.id, item = %self.item, "Secret operation abandoned");
        if let Some(shared) = self.state.upgrade() {
            let mut state = lock_state(&shared);
            state.status = OperationStatus::Idle;
            state.updated_at = Some(chrono::Utc::now().timestamp());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use crate::mocks::{InMemorySecretService, RecordedSecretClient, SecretRequest};
    use crate::traits::MockSecretClient;
    use std::time::Duration;

    fn google() -> ItemDefinition {
        ItemDefinition::new("Google", Category::Accounts).unwrap()
    }

    fn controller(client: impl SecretClient + 'static) -> OperationController {
        OperationController::new(google(), Arc::new(client))
    }

    #[test]
    fn test_initial_state() {
        let c = controller(InMemorySecretService::new());
        assert_eq!(c.state(), ControllerState::default());
        assert_eq!(c.state().status, OperationStatus::Idle);
        assert!(!c.is_pending());
    }

    #[tokio::test]
    async fn test_store_success() {
        let mut mock = MockSecretClient::new();
        mock.expect_store()
            .withf(|record: &SecretRecord| {
                record.username == "alice" && record.item.as_str() == "Google" && record.value == "p@ss1"
            })
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_retrieve().times(0);

        let c = controller(mock);
        let result = c.submit_store("alice", "p@ss1").await;

        assert_eq!(result, OperationResult::Success { value: None });
        let state = c.state();
        assert_eq!(state.status, OperationStatus::Succeeded);
        assert_eq!(state.last_message.as_deref(), Some("Stored successfully"));
        assert_eq!(state.username, "alice");
        assert_eq!(state.pending_value, "p@ss1");
        assert!(state.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_store_rejected() {
        let mut mock = MockSecretClient::new();
        mock.expect_store().times(1).returning(|_| {
            Err(SecretError::Rejected { status: 400, message: "invalid".to_string() })
        });

        let c = controller(mock);
        let result = c.submit_store("alice", "p@ss1").await;

        assert_eq!(
            result,
            OperationResult::Failure { reason: ErrorKind::RemoteRejected, detail: "invalid".to_string() }
        );
        let state = c.state();
        assert_eq!(state.status, OperationStatus::Failed);
        assert!(state.last_message.unwrap().contains("invalid"));
    }

    #[tokio::test]
    async fn test_retrieve_success_records_value() {
        let mut mock = MockSecretClient::new();
        mock.expect_retrieve()
            .withf(|key: &SecretKey| key.username == "alice" && key.item.as_str() == "Google")
            .times(1)
            .returning(|_| Ok("p@ss1".to_string()));

        let c = controller(mock);
        let result = c.submit_retrieve("alice").await;

        assert_eq!(result, OperationResult::Success { value: Some("p@ss1".to_string()) });
        let state = c.state();
        assert_eq!(state.status, OperationStatus::Succeeded);
        assert_eq!(state.last_retrieved_value.as_deref(), Some("p@ss1"));
        assert_eq!(state.last_message.as_deref(), Some("Retrieved successfully"));
    }

    #[tokio::test]
    async fn test_failed_retrieve_clears_previous_value() {
        let service = InMemorySecretService::new();
        let c = controller(service.clone());

        c.submit_store("alice", "p@ss1").await;
        c.submit_retrieve("alice").await;
        assert_eq!(c.state().last_retrieved_value.as_deref(), Some("p@ss1"));

        let result = c.submit_retrieve("mallory").await;

        assert_eq!(result.reason(), Some(ErrorKind::RemoteRejected));
        let state = c.state();
        assert_eq!(state.status, OperationStatus::Failed);
        assert_eq!(state.last_retrieved_value, None);
        assert_eq!(state.last_message.as_deref(), Some("Retrieve error: Secret not found"));
    }

    #[tokio::test]
    async fn test_store_does_not_touch_retrieved_value() {
        let service = InMemorySecretService::new();
        let c = controller(service);

        c.submit_store("alice", "one").await;
        c.submit_retrieve("alice").await;
        c.submit_store("alice", "two").await;

        assert_eq!(c.state().last_retrieved_value.as_deref(), Some("one"));
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_stay_pending() {
        let client = RecordedSecretClient::always_fail(SecretError::Network("connection refused".to_string()));
        let c = controller(client.clone());

        let result = c.submit_store("alice", "p@ss1").await;

        assert_eq!(result.reason(), Some(ErrorKind::TransportError));
        let state = c.state();
        assert_eq!(state.status, OperationStatus::Failed);
        assert!(state.last_message.unwrap().contains("connection refused"));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_busy_rejects_second_submission() {
        let client = RecordedSecretClient::gated("p@ss1");
        let c = Arc::new(controller(client.clone()));

        let first = tokio::spawn({
            let c = Arc::clone(&c);
            async move { c.submit_store("alice", "p@ss1").await }
        });
        while client.call_count() == 0 {
            tokio::task::yield_now().await;
        }

        let second = c.submit_retrieve("alice").await;
        assert_eq!(second.reason(), Some(ErrorKind::Busy));
        assert_eq!(client.call_count(), 1);
        // The in-flight attempt still owns the state
        assert_eq!(c.state().status, OperationStatus::Pending);
        assert_eq!(c.state().last_message, None);

        client.release(1);
        let first = first.await.unwrap();
        assert!(first.is_success());
        assert_eq!(c.state().status, OperationStatus::Succeeded);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_new_attempt_after_failure() {
        let client = RecordedSecretClient::always_fail(SecretError::Timeout);
        let c = controller(client.clone());

        c.submit_store("alice", "p").await;
        assert_eq!(c.state().status, OperationStatus::Failed);

        client.set_behavior(crate::mocks::SecretBehavior::AlwaysSucceed(String::new()));
        let result = c.submit_store("alice", "p").await;

        assert!(result.is_success());
        assert_eq!(c.state().status, OperationStatus::Succeeded);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_abandoned_wait_still_applies_result() {
        let client = RecordedSecretClient::gated("v");
        let c = controller(client.clone());

        let outcome = tokio::time::timeout(Duration::from_millis(20), c.submit_retrieve("alice")).await;

        assert!(outcome.is_err());
        assert_eq!(client.call_count(), 1);
        assert!(c.is_pending());
        assert_eq!(c.submit_retrieve("alice").await.reason(), Some(ErrorKind::Busy));

        client.release(1);
        while c.is_pending() {
            tokio::task::yield_now().await;
        }

        let state = c.state();
        assert_eq!(state.status, OperationStatus::Succeeded);
        assert_eq!(state.last_retrieved_value.as_deref(), Some("v"));
        assert_eq!(state.last_message.as_deref(), Some("Retrieved successfully"));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_result_discarded_with_controller() {
        let client = RecordedSecretClient::gated("");
        let c = controller(client.clone());
        let shared = Arc::downgrade(&c.state);

        let outcome = tokio::time::timeout(Duration::from_millis(20), c.submit_store("alice", "p")).await;
        assert!(outcome.is_err());

        drop(c);
        assert!(shared.upgrade().is_none());

        client.release(1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_pending_inputs_are_submitted() {
        let client = RecordedSecretClient::success("");
        let c = controller(client.clone());

        c.set_username("alice");
        let generated = c.fill_generated_password();
        assert_eq!(generated.len(), password::DEFAULT_LENGTH);
        assert_eq!(c.state().pending_value, generated);

        c.submit_pending_store().await;
        c.submit_pending_retrieve().await;

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        match &requests[0] {
            SecretRequest::Store(record) => {
                assert_eq!(record.username, "alice");
                assert_eq!(record.value, generated);
            }
            other => panic!("Expected store request, got {:?}", other),
        }
        match &requests[1] {
            SecretRequest::Retrieve(key) => assert_eq!(key.username, "alice"),
            other => panic!("Expected retrieve request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_fields_are_dispatched() {
        let mut mock = MockSecretClient::new();
        mock.expect_store()
            .withf(|record: &SecretRecord| record.username.is_empty() && record.value.is_empty())
            .times(1)
            .returning(|_| {
                Err(SecretError::Rejected { status: 400, message: "username and value are required".to_string() })
            });

        let c = controller(mock);
        let result = c.submit_store("", "").await;

        assert_eq!(result.reason(), Some(ErrorKind::RemoteRejected));
        assert_eq!(c.state().status, OperationStatus::Failed);
    }
}
