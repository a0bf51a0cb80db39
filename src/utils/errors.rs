use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for apiprobe
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    TransportFailure(String),

    #[error("Conflicting write to {path}: {message}")]
    RemoteStoreConflict { path: String, message: String },

    #[error("Remote store error ({status}): {message}")]
    RemoteStore { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error(
        "Moved {source_path} to {destination_path} but could not delete the source, both files now exist: {reason}"
    )]
    PartialMove {
        source_path: String,
        destination_path: String,
        reason: Box<ProbeError>,
    },

    #[error("Malformed AI output: {0}")]
    MalformedAiOutput(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ProbeError::InvalidInput(err.to_string())
        } else {
            ProbeError::TransportFailure(err.to_string())
        }
    }
}

impl ProbeError {
    /// Whether the remote store reported the target as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProbeError::NotFound(_))
    }
}

/// User-visible form of a failed request or step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
}

impl From<&ProbeError> for ErrorRecord {
    fn from(err: &ProbeError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl From<ProbeError> for ErrorRecord {
    fn from(err: ProbeError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_record_carries_display_message() {
        let err = ProbeError::AlreadyExists("src/main.rs".to_string());
        let record = ErrorRecord::from(&err);
        assert_eq!(record.message, "Already exists: src/main.rs");
    }

    #[test]
    fn test_partial_move_names_both_paths() {
        let err = ProbeError::PartialMove {
            source_path: "a.txt".to_string(),
            destination_path: "b.txt".to_string(),
            reason: Box::new(ProbeError::RemoteStore {
                status: 500,
                message: "boom".to_string(),
            }),
        };
        let text = err.to_string();
        assert!(text.contains("a.txt"));
        assert!(text.contains("b.txt"));
        assert!(text.contains("boom"));
    }
}
