//! Error types for ghmirror

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for ghmirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ghmirror operations
///
/// Variants split into two groups. Fatal errors (`Listing`, `Credential`,
/// `Auth`, `Config`) end the run. Everything else is scoped to a single
/// repository and is logged and dropped by the worker that hit it.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or unusable token
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Enumerating the account's repositories failed
    #[error("Listing repositories failed: {0}")]
    Listing(String),

    /// Provisioning the git credential cache failed
    #[error("Credential provisioning failed: {0}")]
    Credential(String),

    /// The owner directory for a mirror could not be created
    #[error("Creating directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A repository name that cannot be mapped to a path under the mirror root
    #[error("Invalid repository name: {0:?}")]
    InvalidName(String),

    /// `git clone --mirror` failed
    #[error("Clone of {repo} failed: {detail}")]
    CloneFailed { repo: String, detail: String },

    /// `git remote update --prune` failed
    #[error("Fetch of {repo} failed: {detail}")]
    FetchFailed { repo: String, detail: String },

    /// `git gc` failed
    #[error("Garbage collection of {repo} failed: {detail}")]
    GcFailed { repo: String, detail: String },

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error should abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Listing(_) | Error::Credential(_) | Error::Auth(_) | Error::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::Listing("boom".into()).is_fatal());
        assert!(Error::Credential("boom".into()).is_fatal());
        assert!(!Error::CloneFailed {
            repo: "a/b".into(),
            detail: "exit status 128".into()
        }
        .is_fatal());
        assert!(!Error::DirectoryCreation {
            path: PathBuf::from("a"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .is_fatal());
    }

    #[test]
    fn test_messages_name_the_repository() {
        let err = Error::FetchFailed {
            repo: "acme/widgets".into(),
            detail: "exit status 1".into(),
        };
        assert_eq!(err.to_string(), "Fetch of acme/widgets failed: exit status 1");
    }
}
