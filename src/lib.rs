//! Lockbox - store and retrieve named secrets against a remote service
//!
//! This library provides the client core for the lock box: the wire client for
//! the store/retrieve endpoints, a per-item operation controller, and a local
//! password generator. It is organized around trait-based dependency injection
//! for testability.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod mocks;
pub mod password;
pub mod production;
pub mod traits;

mod state;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use catalog::{Category, ItemDefinition, ItemName, StaticCatalog};
pub use config::ClientConfig;
pub use controller::{ControllerState, OperationController, OperationStatus};
pub use password::{generate_password, generate_password_with_length};
pub use state::LockboxState;
pub use traits::{ErrorKind, OperationResult, SecretClient, SecretError};

/// Install a stdout subscriber filtered by `RUST_LOG` (default `lockbox=info`).
///
/// For hosts that have no subscriber of their own. Calling it more than once,
/// or after another subscriber is set, leaves the existing one in place.
pub fn init_logging() {
    let installed = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lockbox=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if installed.is_ok() {
        tracing::info!("Lockbox logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
        tracing::debug!("still logging");
    }
}
