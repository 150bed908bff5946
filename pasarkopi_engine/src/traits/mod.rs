//! The seams between the engine and the outside world.
//!
//! The engine never talks to a network or a disk directly. Checkout and tracking go through [`OrderService`],
//! durable state goes through [`KeyValueStore`], and the signed-in credential comes from an [`AuthProvider`].
//! Production wires these up with the HTTP client crate and a JSON file store; tests swap in the deterministic
//! fakes from `test_utils`.

mod auth;
mod order_service;
mod storage;

pub use auth::{AuthProvider, CredentialStore, AUTH_TOKEN_KEY};
pub use order_service::{GatewaySession, NewOrderRequest, NewTransactionRequest, OrderService, OrderServiceError};
pub use storage::{KeyValueStore, StorageError};
