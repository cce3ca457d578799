//! Error types for the Qobuz provider

use core_library::LibraryError;
use thiserror::Error;

use crate::PROVIDER_ID;

/// Qobuz provider errors
#[derive(Error, Debug)]
pub enum QobuzError {
    /// Login returned no token
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The remote rejected the session token (expired or revoked)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The API answered with an error payload or a non-success status
    #[error("Qobuz API error (code {code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    /// Response body was not the JSON document we expected
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// An album record without an artist cannot be placed in the library
    #[error("Album {album_id} has no artist")]
    MissingArtist { album_id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Qobuz operations
pub type Result<T> = std::result::Result<T, QobuzError>;

impl QobuzError {
    /// Failures that invalidate the current session
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, QobuzError::Unauthorized(_))
    }
}

impl From<core_runtime::Error> for QobuzError {
    fn from(error: core_runtime::Error) -> Self {
        QobuzError::Config(error.to_string())
    }
}

impl From<QobuzError> for LibraryError {
    fn from(error: QobuzError) -> Self {
        match error {
            QobuzError::AuthenticationFailed(message) | QobuzError::Unauthorized(message) => {
                LibraryError::Authentication {
                    provider: PROVIDER_ID.to_string(),
                    message,
                }
            }
            QobuzError::MissingArtist { album_id } => LibraryError::DataIntegrity {
                provider: PROVIDER_ID.to_string(),
                message: format!("album {} has no artist", album_id),
            },
            QobuzError::NotFound { kind, id } => LibraryError::NotFound {
                entity_type: kind.to_string(),
                id,
            },
            QobuzError::Config(message) => LibraryError::InvalidInput {
                field: "config".to_string(),
                message,
            },
            QobuzError::Bridge(error) => LibraryError::Bridge(error),
            other => LibraryError::Provider {
                provider: PROVIDER_ID.to_string(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_map_to_authentication() {
        let err: LibraryError = QobuzError::AuthenticationFailed("no token".to_string()).into();
        assert!(matches!(
            err,
            LibraryError::Authentication { ref provider, .. } if provider == "qobuz"
        ));

        let err: LibraryError = QobuzError::Unauthorized("expired".to_string()).into();
        assert!(matches!(err, LibraryError::Authentication { .. }));
    }

    #[test]
    fn test_missing_artist_maps_to_data_integrity() {
        let err: LibraryError = QobuzError::MissingArtist {
            album_id: "0060254735180".to_string(),
        }
        .into();
        assert!(err.to_string().contains("0060254735180"));
        assert!(matches!(err, LibraryError::DataIntegrity { .. }));
    }

    #[test]
    fn test_api_error_maps_to_provider() {
        let err: LibraryError = QobuzError::ApiError {
            code: 400,
            message: "Invalid argument".to_string(),
        }
        .into();
        assert!(matches!(err, LibraryError::Provider { .. }));
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(QobuzError::Unauthorized("x".to_string()).is_unauthorized());
        assert!(!QobuzError::Network("x".to_string()).is_unauthorized());
    }
}
