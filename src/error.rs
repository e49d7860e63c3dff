use std::path::PathBuf;

use thiserror::Error;

/// Failure to obtain one of the dashboard's JSON documents.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("server returned {status} for {path}")]
    Status { status: u16, path: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// A well-formed "nothing here for this selector" answer, as opposed to a
    /// transport or server failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),
}
