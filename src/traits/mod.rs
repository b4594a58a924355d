//! Trait definitions for dependency injection
//!
//! The remote service and the item catalog sit behind traits so controllers
//! can be tested without a network.

mod item_catalog;
mod secret_client;

pub use item_catalog::ItemCatalog;
pub use secret_client::{ErrorKind, OperationResult, SecretClient, SecretError, SecretKey, SecretRecord};

#[cfg(test)]
pub use secret_client::MockSecretClient;
