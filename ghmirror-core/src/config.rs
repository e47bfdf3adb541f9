//! Configuration management for ghmirror
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (GHMIRROR_*)
//! 3. Config file (~/.config/ghmirror/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pipeline::DEFAULT_WORKERS;
use crate::{Error, Result};

/// Host used when `github.host` is not configured
const DEFAULT_HOST: &str = "github.com";

/// Where and how mirrors are written
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Directory that holds `<owner>/<repo>.git` mirrors
    pub root: PathBuf,

    /// Number of repositories mirrored concurrently
    pub workers: usize,

    /// Path to the git executable
    pub git_path: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            workers: DEFAULT_WORKERS,
            git_path: "git".to_string(),
        }
    }
}

/// Forge connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Host clones are made from, used for credential provisioning
    pub host: String,

    /// API base URL; `None` uses public GitHub
    pub api_url: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_url: None,
        }
    }
}

/// Credential cache settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Prime git's credential cache with the token before mirroring
    pub provision: bool,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Mirror configuration
    pub mirror: MirrorConfig,

    /// GitHub configuration
    pub github: GitHubConfig,

    /// Credential configuration
    pub credentials: CredentialsConfig,
}

/// Values given on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root: Option<PathBuf>,
    pub workers: Option<usize>,
    pub git_path: Option<String>,
    pub api_url: Option<String>,
    pub provision_credentials: bool,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config {}: {}", path.display(), e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/ghmirror/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ghmirror").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - GHMIRROR_ROOT: Mirror root directory
    /// - GHMIRROR_WORKERS: Number of workers
    /// - GHMIRROR_GIT_PATH: Path to git executable
    /// - GHMIRROR_API_URL: API base URL
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(root) = var("GHMIRROR_ROOT") {
            self.mirror.root = PathBuf::from(root);
        }

        if let Some(workers) = var("GHMIRROR_WORKERS") {
            self.mirror.workers = workers.trim().parse().map_err(|_| {
                Error::Config(format!("GHMIRROR_WORKERS is not a number: {}", workers))
            })?;
        }

        if let Some(git_path) = var("GHMIRROR_GIT_PATH") {
            self.mirror.git_path = git_path;
        }

        if let Some(api_url) = var("GHMIRROR_API_URL") {
            self.github.api_url = Some(api_url);
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, cli: CliOverrides) -> Self {
        if let Some(root) = cli.root {
            self.mirror.root = root;
        }

        if let Some(workers) = cli.workers {
            self.mirror.workers = workers;
        }

        if let Some(git_path) = cli.git_path {
            self.mirror.git_path = git_path;
        }

        if let Some(api_url) = cli.api_url {
            self.github.api_url = Some(api_url);
        }

        if cli.provision_credentials {
            self.credentials.provision = true;
        }

        self
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.mirror.workers == 0 {
            return Err(Error::Config("mirror.workers must be at least 1".to_string()));
        }

        if self.mirror.git_path.trim().is_empty() {
            return Err(Error::Config("mirror.git_path must not be empty".to_string()));
        }

        if let Some(ref api_url) = self.github.api_url {
            url::Url::parse(api_url)
                .map_err(|e| Error::Config(format!("Invalid github.api_url {}: {}", api_url, e)))?;
        }

        Ok(())
    }

    /// Host the credential cache is seeded for
    ///
    /// An explicit `github.host` wins. Left at its default, the host of
    /// `github.api_url` is used instead, so an Enterprise API URL alone is
    /// enough to seed credentials for that server.
    pub fn credential_host(&self) -> String {
        if self.github.host != DEFAULT_HOST {
            return self.github.host.clone();
        }

        let api_host = self
            .github
            .api_url
            .as_deref()
            .and_then(|api_url| url::Url::parse(api_url).ok())
            .and_then(|url| {
                let host = url.host_str()?.to_string();
                Some(match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host,
                })
            });

        api_host.unwrap_or_else(|| self.github.host.clone())
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(config_file: Option<&Path>, cli: CliOverrides) -> Result<Self> {
        let base = match config_file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        let config = base.with_env_overrides()?.with_cli_overrides(cli);
        config.validate()?;
        Ok(config)
    }
}
