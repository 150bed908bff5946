//! HTTP client for the Pasar Kopi order service.
//!
//! [`StorefrontApi`] implements the engine's `OrderService` trait over the order service's REST API. Every
//! request carries the signed-in buyer's bearer credential, and non-2xx responses surface the server's own error
//! message so the UI can show it verbatim.

mod api;
mod config;
mod data_objects;
mod error;

pub use api::StorefrontApi;
pub use config::{StorefrontConfig, DEFAULT_API_TIMEOUT, DEFAULT_API_URL};
pub use data_objects::server_error_message;
pub use error::StorefrontApiError;
