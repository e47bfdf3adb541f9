//! Wiring of lister, queue and dispatch pool for one mirroring run

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use super::lister::{list_repos, RepoSource};
use super::pool::{DispatchPool, WorkerTally};
use crate::config::Config;
use crate::git::{provision, CommandRunner, CredentialSeed, GitCommands, Mirror};
use crate::repo::MirrorLayout;
use crate::{Error, Result};

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Repositories the listing produced
    pub listed: usize,
    /// Mirrors created
    pub cloned: usize,
    /// Mirrors fetched and compacted
    pub updated: usize,
    /// Repositories that stopped at an error
    pub failed: usize,
}

/// Runs the whole pipeline once
///
/// Queue and worker state are created per [`Orchestrator::run`] call, so one
/// orchestrator can run several times in the same process.
pub struct Orchestrator {
    layout: MirrorLayout,
    git: GitCommands,
    pool: DispatchPool,
    runner: Arc<dyn CommandRunner>,
    credential: Option<CredentialSeed>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("layout", &self.layout)
            .field("git", &self.git)
            .field("pool", &self.pool)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator writing mirrors under `layout`
    pub fn new(layout: MirrorLayout, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            layout,
            git: GitCommands::default(),
            pool: DispatchPool::default(),
            runner,
            credential: None,
        }
    }

    /// Create an orchestrator from loaded configuration
    pub fn from_config(config: &Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(MirrorLayout::new(&config.mirror.root), runner)
            .with_workers(config.mirror.workers)
            .with_git_path(&config.mirror.git_path)
    }

    /// Set the number of workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.pool = DispatchPool::new(workers);
        self
    }

    /// Set the git executable
    pub fn with_git_path(mut self, git_path: impl Into<String>) -> Self {
        self.git = GitCommands::new(git_path);
        self
    }

    /// Prime the git credential cache with `seed` before dispatching
    pub fn with_credential(mut self, seed: CredentialSeed) -> Self {
        self.credential = Some(seed);
        self
    }

    /// List every repository of `source` and mirror each one
    ///
    /// Returns `Err` only for fatal conditions: credential provisioning or
    /// listing failed. Per-repository failures are logged by the workers and
    /// counted in the summary.
    ///
    /// Repositories from pages listed before a listing failure may already
    /// have been mirrored when the error is returned.
    pub async fn run<S>(&self, source: Arc<S>) -> Result<RunSummary>
    where
        S: RepoSource + 'static,
    {
        if let Some(ref seed) = self.credential {
            provision(self.runner.as_ref(), self.git.git_path(), seed).await?;
        }

        let mirror = Arc::new(Mirror::new(
            self.layout.clone(),
            self.git.clone(),
            Arc::clone(&self.runner),
        ));

        let (tx, rx) = mpsc::channel(self.pool.queue_capacity());
        let lister = tokio::spawn(async move { list_repos(source.as_ref(), tx).await });
        let mut workers = self.pool.spawn(rx, mirror);

        let listed = match lister.await {
            Ok(Ok(listed)) => listed,
            Ok(Err(e)) => {
                error!(error = %e, "Repository listing failed, aborting run");
                workers.shutdown().await;
                return Err(match e {
                    Error::Listing(_) => e,
                    other => Error::Listing(other.to_string()),
                });
            }
            Err(join) => {
                workers.shutdown().await;
                return Err(Error::Listing(format!("listing task failed: {}", join)));
            }
        };

        let mut tally = WorkerTally::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker) => tally += worker,
                Err(e) => error!(error = %e, "Worker task failed"),
            }
        }

        let summary = RunSummary {
            listed,
            cloned: tally.cloned,
            updated: tally.updated,
            failed: tally.failed,
        };
        info!(
            listed = summary.listed,
            cloned = summary.cloned,
            updated = summary.updated,
            failed = summary.failed,
            "Mirroring run complete"
        );

        Ok(summary)
    }
}
