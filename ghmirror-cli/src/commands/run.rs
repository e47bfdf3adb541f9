//! Run command - Mirror every repository of the account

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use ghmirror_core::config::CliOverrides;
use ghmirror_core::{Config, CredentialSeed, Orchestrator, Secrets, SystemRunner};
use ghmirror_github::GitHubClient;

/// Arguments for the run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Prime git's credential cache with the token before mirroring
    #[arg(long)]
    pub set_credential: bool,

    /// Number of repositories mirrored concurrently
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Directory that holds the mirrors (defaults to current directory)
    #[arg(short = 'd', long)]
    pub root: Option<PathBuf>,

    /// Path to the git executable
    #[arg(long)]
    pub git_path: Option<String>,

    /// GitHub API base URL, for GitHub Enterprise
    #[arg(long)]
    pub api_url: Option<String>,
}

impl RunArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            root: self.root.clone(),
            workers: self.workers,
            git_path: self.git_path.clone(),
            api_url: self.api_url.clone(),
            provision_credentials: self.set_credential,
        }
    }

    /// Execute the run command
    pub async fn execute(&self, verbose: bool, config_file: Option<&Path>) -> anyhow::Result<()> {
        let config = Config::load_with_overrides(config_file, self.overrides())?;

        if verbose {
            tracing::info!(
                root = %config.mirror.root.display(),
                workers = config.mirror.workers,
                git_path = %config.mirror.git_path,
                provision = config.credentials.provision,
                "Configuration loaded"
            );
        }

        let token = Secrets::load()?.require_github_token()?;

        let client = match config.github.api_url {
            Some(ref api_url) => GitHubClient::with_api_url(token.clone(), api_url.clone()),
            None => GitHubClient::new(token.clone()),
        }
        .context("Failed to create GitHub client")?;

        // A rejected token fails here instead of on the first listing page
        let login = client
            .test_connection()
            .await
            .context("Failed to authenticate with GitHub")?;
        tracing::debug!(login = %login, "Authenticated");

        let mut orchestrator = Orchestrator::from_config(&config, Arc::new(SystemRunner::new()));
        if config.credentials.provision {
            let seed = CredentialSeed::for_token(&config.credential_host(), token);
            orchestrator = orchestrator.with_credential(seed);
        }

        let summary = orchestrator.run(Arc::new(client)).await?;

        if summary.failed > 0 {
            tracing::warn!(
                failed = summary.failed,
                "Some repositories could not be mirrored, see log above"
            );
        }

        Ok(())
    }
}
