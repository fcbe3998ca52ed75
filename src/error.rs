use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = BattlerError> = std::result::Result<T, E>;

// Enum for every way a battler run can fail.
#[derive(Debug, Error)]
pub enum BattlerError {
    #[error("{0} is not defined")]
    MissingField(&'static str), // A required input was empty or unset.

    #[error("{0}")]
    InvalidFormat(String), // An input was present but malformed.

    #[error("Battle input is missing {0}")]
    IncompleteInput(&'static str), // Battle input lacks one of its required sections.

    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String), // Flag combination rejected before any remote call.

    #[error("Generation failed: {0}")]
    GenerationFailed(String), // The generation call errored or produced no text.

    #[error("Remote service error: {0}")]
    Remote(#[from] RemoteError), // Errors from listing, uploading, or caching.

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Errors raised by a remote generative service. These are never retried.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Environment variable {0} is not set")]
    MissingCredential(String),
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::InvalidResponse(err.to_string())
    }
}
