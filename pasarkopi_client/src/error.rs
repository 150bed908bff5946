use pasarkopi_engine::OrderServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorefrontApiError {
    #[error("Could not initialize the HTTP client: {0}")]
    Initialization(String),
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Could not reach the order service: {0}")]
    Transport(String),
    #[error("Could not deserialize the server response: {0}")]
    JsonError(String),
    #[error("Request failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl From<StorefrontApiError> for OrderServiceError {
    fn from(e: StorefrontApiError) -> Self {
        match e {
            StorefrontApiError::NotAuthenticated => OrderServiceError::NotAuthenticated,
            StorefrontApiError::QueryError { status, message } => OrderServiceError::Remote { status, message },
            StorefrontApiError::Transport(m) | StorefrontApiError::Initialization(m) => OrderServiceError::Network(m),
            StorefrontApiError::JsonError(m) => OrderServiceError::InvalidResponse(m),
        }
    }
}
