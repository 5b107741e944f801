//! Runtime bootstrap errors

use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A setting failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// A host bridge the core needs was neither injected nor defaulted
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// The default bridge could not be constructed
    #[error("Transport setup failed: {0}")]
    Transport(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_error_converts() {
        let error: Error = BridgeError::OperationFailed("tls backend unavailable".to_string()).into();
        assert!(matches!(error, Error::Transport(_)));
        assert!(error.to_string().contains("tls backend unavailable"));
    }

    #[test]
    fn test_capability_missing_display() {
        let error = Error::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: "inject a transport".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Capability missing: HttpClient - inject a transport"
        );
    }
}
