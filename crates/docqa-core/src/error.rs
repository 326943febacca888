use std::path::PathBuf;

use thiserror::Error;

/// Failure to read the document folder.
///
/// Caught at startup and logged; the pipeline keeps running without an index.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("document folder not found: {0}")]
    MissingDir(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("no files found in {0}")]
    NoFiles(PathBuf),

    #[error("documents in {0} contain no indexable text")]
    NoContent(PathBuf),

    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract text from {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    /// Language-model request failure. Never retried.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid prompt template: {0}")]
    Template(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Index storage error: {0}")]
    Storage(String),

    #[error("No index is available; the startup build did not complete")]
    IndexUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Pull a readable message out of a provider error body, falling back to the raw text.
pub fn provider_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorEnvelope {
        error: ErrorDetail,
    }
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum ErrorDetail {
        Object { message: String },
        Text(String),
    }
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error: ErrorDetail::Object { message } }) => message,
        Ok(ErrorEnvelope { error: ErrorDetail::Text(message) }) => message,
        Err(_) => body.trim().to_string(),
    }
}
