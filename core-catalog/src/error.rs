//! Error types for the catalog client

use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[from] BridgeError),

    /// The server answered with a non-success status
    #[error("Server returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Connection `{0}` already exists")]
    DuplicateSession(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl CatalogError {
    pub(crate) fn parse(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CatalogError::Status {
            status: 404,
            url: "https://gis.example.com/api/resource/7".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Server returned status 404 for https://gis.example.com/api/resource/7"
        );

        assert_eq!(
            CatalogError::MissingField("display_name").to_string(),
            "Missing required field `display_name`"
        );
    }

    #[test]
    fn test_bridge_error_conversion() {
        let error: CatalogError = BridgeError::Timeout("schema".to_string()).into();
        assert!(matches!(error, CatalogError::Transport(_)));
    }
}
