//! Production implementations of traits

mod secret_client;

pub use secret_client::ReqwestSecretClient;
