//! GitHub API client using octocrab

use crate::{Error, Result};
use octocrab::Octocrab;
use tracing::{debug, info};

/// GitHub API client authenticated as one account
pub struct GitHubClient {
    client: Octocrab,
    api_url: Option<String>,
}

impl GitHubClient {
    /// Create a client for public GitHub authenticated with `token`
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::build(token.into(), None)
    }

    /// Create a client for a GitHub Enterprise API at `api_url`
    ///
    /// `api_url` is the REST root, e.g. `https://ghe.example.com/api/v3`.
    pub fn with_api_url(token: impl Into<String>, api_url: impl Into<String>) -> Result<Self> {
        Self::build(token.into(), Some(api_url.into()))
    }

    fn build(token: String, api_url: Option<String>) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::Auth("GitHub token is empty".to_string()));
        }

        let mut builder = Octocrab::builder().personal_token(token);
        if let Some(ref url) = api_url {
            builder = builder
                .base_uri(url.as_str())
                .map_err(|e| Error::Parse(format!("Invalid API URL {}: {}", url, e)))?;
        }

        let client = builder
            .build()
            .map_err(|e| Error::Auth(format!("Failed to create GitHub client: {}", e)))?;

        info!(api_url = api_url.as_deref().unwrap_or("https://api.github.com"), "Created GitHub client");

        Ok(Self { client, api_url })
    }

    /// Get the underlying octocrab client
    pub fn client(&self) -> &Octocrab {
        &self.client
    }

    /// Get the custom API URL, if any
    pub fn api_url(&self) -> Option<&str> {
        self.api_url.as_deref()
    }

    /// Test the token by fetching the authenticated user
    pub async fn test_connection(&self) -> Result<String> {
        debug!("Testing GitHub connection");

        let user = self
            .client
            .current()
            .user()
            .await
            .map_err(map_api_error)?;

        info!(login = %user.login, "GitHub connection successful");
        Ok(user.login)
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

/// Turn credential rejections into [`Error::Auth`]
pub(crate) fn map_api_error(e: octocrab::Error) -> Error {
    match e {
        octocrab::Error::GitHub { source, .. } if is_bad_credentials(&source.message) => {
            Error::Auth("Invalid GitHub token".to_string())
        }
        other => Error::Api(other),
    }
}

fn is_bad_credentials(message: &str) -> bool {
    message.contains("Bad credentials")
}
