use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid run ID: {0}")]
    InvalidRunId(String),

    #[error("Invalid sync status: {0}")]
    InvalidStatus(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_display() {
        let error = SyncError::InvalidStateTransition {
            from: "completed".to_string(),
            to: "running".to_string(),
            reason: "terminal".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid state transition from completed to running: terminal"
        );
    }
}
