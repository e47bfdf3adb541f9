//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// GitHub API error
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<Error> for ghmirror_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Auth(msg) => ghmirror_core::Error::Auth(msg),
            other => ghmirror_core::Error::Listing(other.to_string()),
        }
    }
}
