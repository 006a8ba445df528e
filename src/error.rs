//! Error types for Alice operations

use thiserror::Error;

/// Main error type for Alice operations
#[derive(Error, Debug)]
pub enum AliceError {
    /// Conversation id unknown to storage
    #[error("Conversation '{0}' not found")]
    NotFound(String),

    /// Generation invoked before the backend was loaded
    #[error("Generation backend is not loaded")]
    BackendNotReady,

    /// The backend raised during load or generate
    #[error("Generation backend failure: {0}")]
    BackendFailure(String),

    /// Storage returned data that could not be deserialized
    #[error("Malformed record '{id}': {reason}")]
    MalformedRecord { id: String, reason: String },

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for AliceError {
    fn from(err: serde_json::Error) -> Self {
        AliceError::Serialization(err.to_string())
    }
}

impl AliceError {
    /// Whether the error means "nothing stored under that id"
    pub fn is_not_found(&self) -> bool {
        matches!(self, AliceError::NotFound(_))
    }
}

/// Result type alias for Alice operations
pub type AliceResult<T> = Result<T, AliceError>;
