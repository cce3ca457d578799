use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Authentication failed for provider {provider}: {message}")]
    Authentication { provider: String, message: String },

    #[error("Inconsistent data from provider {provider}: {message}")]
    DataIntegrity { provider: String, message: String },

    #[error("Provider {provider} error: {message}")]
    Provider { provider: String, message: String },
}

pub type Result<T> = std::result::Result<T, LibraryError>;
