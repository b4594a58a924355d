//! Application state management

use std::sync::Arc;

use crate::catalog::{Category, ItemDefinition};
use crate::config::ClientConfig;
use crate::controller::OperationController;
use crate::production::ReqwestSecretClient;
use crate::traits::{ItemCatalog, SecretClient, SecretError};

/// Shared dependencies, and the factory for per-item controllers
///
/// Controllers built here share the client and nothing else.
#[derive(Clone)]
pub struct LockboxState {
    pub client: Arc<dyn SecretClient>,
}

impl LockboxState {
    /// Create a new LockboxState talking to the real service
    pub fn new_production(config: &ClientConfig) -> Result<Self, SecretError> {
        tracing::info!(base_url = %config.base_url, "Initializing LockboxState");
        let client = Arc::new(ReqwestSecretClient::new(config)?);
        Ok(Self { client })
    }

    /// Create state around any client (mocks in tests)
    pub fn with_client(client: Arc<dyn SecretClient>) -> Self {
        Self { client }
    }

    /// Fresh controller for one item's form
    pub fn controller_for(&self, item: &ItemDefinition) -> OperationController {
        tracing::debug!(item = %item.name, category = ?item.category, "Creating controller");
        OperationController::new(item.clone(), Arc::clone(&self.client))
    }

    /// One controller per catalog item in `category`
    pub fn controllers_for(&self, catalog: &dyn ItemCatalog, category: Category) -> Vec<OperationController> {
        catalog
            .items_in(category)
            .iter()
            .map(|item| self.controller_for(item))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::controller::OperationStatus;
    use crate::mocks::InMemorySecretService;

    #[test]
    fn test_production_state() {
        assert!(LockboxState::new_production(&ClientConfig::default()).is_ok());

        let bad = ClientConfig::default().with_base_url("::");
        assert!(LockboxState::new_production(&bad).is_err());
    }

    #[test]
    fn test_controllers_for_category() {
        let state = LockboxState::with_client(Arc::new(InMemorySecretService::new()));
        let catalog = StaticCatalog::builtin();

        let cards = state.controllers_for(&catalog, Category::PaymentCards);
        let names: Vec<&str> = cards.iter().map(|c| c.item().name.as_str()).collect();

        assert_eq!(names, vec!["Visa", "MasterCard", "Amex", "American Express", "ATM Card"]);
        assert!(cards.iter().all(|c| c.state().status == OperationStatus::Idle));
    }

    #[tokio::test]
    async fn test_controllers_share_only_the_service() {
        let service = InMemorySecretService::new();
        let state = LockboxState::with_client(Arc::new(service.clone()));
        let catalog = StaticCatalog::builtin();

        let google = state.controller_for(&catalog.find("Google").unwrap());
        let dropbox = state.controller_for(&catalog.find("Dropbox").unwrap());

        google.submit_store("alice", "g-pass").await;

        assert_eq!(service.len(), 1);
        assert_eq!(dropbox.state().status, OperationStatus::Idle);
        assert!(dropbox.submit_retrieve("alice").await.reason().is_some());
        assert_eq!(google.state().status, OperationStatus::Succeeded);
    }
}
