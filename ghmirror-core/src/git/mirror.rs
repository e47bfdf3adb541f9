//! Clone-or-update of a single bare mirror
//!
//! The state of a mirror is just whether its directory exists:
//!
//! - absent: `git clone --mirror <url> <path>`
//! - present: `git remote update --prune`, then `git gc --force`
//!
//! A directory left behind by an interrupted clone counts as present and is
//! fetched into like any other mirror.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::command::{CommandOutput, CommandRunner, Invocation};
use crate::repo::{MirrorLayout, RepoRef};
use crate::Result;

/// On-disk state that decides between clone and fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorState {
    /// No directory at the mirror path
    Absent,
    /// Something exists at the mirror path
    Present,
}

impl MirrorState {
    /// Inspect `local_path`
    ///
    /// Only a definite "not found" routes to clone; any other lookup error
    /// routes to fetch, which will then report the real problem.
    pub async fn detect(local_path: &Path) -> Self {
        match tokio::fs::symlink_metadata(local_path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MirrorState::Absent,
            _ => MirrorState::Present,
        }
    }
}

/// What a successful mirror operation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// A new mirror was cloned
    Cloned,
    /// An existing mirror was fetched and compacted
    Updated,
}

/// Which git step an invocation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Clone,
    Fetch,
    Gc,
}

impl Step {
    fn label(self) -> &'static str {
        match self {
            Step::Clone => "git clone --mirror",
            Step::Fetch => "git remote update",
            Step::Gc => "git gc",
        }
    }

    fn error(self, repo: &RepoRef, detail: String) -> crate::Error {
        let repo = repo.full_name().to_string();
        match self {
            Step::Clone => crate::Error::CloneFailed { repo, detail },
            Step::Fetch => crate::Error::FetchFailed { repo, detail },
            Step::Gc => crate::Error::GcFailed { repo, detail },
        }
    }
}

/// Builds the git invocations used for mirroring
#[derive(Debug, Clone)]
pub struct GitCommands {
    git_path: String,
}

impl GitCommands {
    /// Use the git executable at `git_path`
    pub fn new(git_path: impl Into<String>) -> Self {
        Self {
            git_path: git_path.into(),
        }
    }

    /// Get the configured git executable
    pub fn git_path(&self) -> &str {
        &self.git_path
    }

    /// `git clone --mirror -- <url> <path>`
    pub fn clone_mirror(&self, clone_url: &str, local_path: &Path) -> Invocation {
        Invocation::new(&self.git_path)
            .arg("clone")
            .arg("--mirror")
            .arg("--")
            .arg(clone_url)
            .arg(local_path)
            .env("GIT_TERMINAL_PROMPT", "0")
    }

    /// `git remote update --prune`, run inside the mirror
    pub fn remote_update(&self, local_path: &Path) -> Invocation {
        Invocation::new(&self.git_path)
            .args(["remote", "update", "--prune"])
            .current_dir(local_path)
            .env("GIT_TERMINAL_PROMPT", "0")
    }

    /// `git gc --force`, run inside the mirror in the foreground
    ///
    /// `gc.autoDetach` is overridden through `GIT_CONFIG_*` for this process
    /// only; the mirror's own config is never written.
    pub fn gc(&self, local_path: &Path) -> Invocation {
        Invocation::new(&self.git_path)
            .args(["gc", "--force"])
            .current_dir(local_path)
            .env("GIT_CONFIG_COUNT", "1")
            .env("GIT_CONFIG_KEY_0", "gc.autoDetach")
            .env("GIT_CONFIG_VALUE_0", "false")
    }
}

impl Default for GitCommands {
    fn default() -> Self {
        Self::new("git")
    }
}

/// Mirrors single repositories into a [`MirrorLayout`]
#[derive(Clone)]
pub struct Mirror {
    layout: MirrorLayout,
    git: GitCommands,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror")
            .field("layout", &self.layout)
            .field("git", &self.git)
            .finish_non_exhaustive()
    }
}

impl Mirror {
    /// Create a mirror operation over `layout`, running git through `runner`
    pub fn new(layout: MirrorLayout, git: GitCommands, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            layout,
            git,
            runner,
        }
    }

    /// Bring the mirror of `repo` up to date, cloning it if needed
    pub async fn sync(&self, repo: &RepoRef) -> Result<MirrorOutcome> {
        let paths = self.layout.resolve(repo).await?;

        match MirrorState::detect(&paths.local_path).await {
            MirrorState::Absent => {
                info!(repo = %repo, path = %paths.local_path.display(), "Cloning mirror");
                self.step(repo, Step::Clone, self.git.clone_mirror(repo.clone_url(), &paths.local_path))
                    .await?;
                Ok(MirrorOutcome::Cloned)
            }
            MirrorState::Present => {
                info!(repo = %repo, path = %paths.local_path.display(), "Fetching mirror");
                self.step(repo, Step::Fetch, self.git.remote_update(&paths.local_path))
                    .await?;
                self.step(repo, Step::Gc, self.git.gc(&paths.local_path))
                    .await?;
                Ok(MirrorOutcome::Updated)
            }
        }
    }

    async fn step(&self, repo: &RepoRef, step: Step, invocation: Invocation) -> Result<CommandOutput> {
        let output = self
            .runner
            .run(&invocation)
            .await
            .map_err(|e| step.error(repo, format!("failed to run {}: {}", step.label(), e)))?;

        if !output.success {
            warn!(
                repo = %repo,
                command = %invocation.display(),
                status = %output.status_line(),
                output = %output.output.trim_end(),
                "{} failed",
                step.label()
            );
            return Err(step.error(repo, output.status_line()));
        }

        debug!(
            repo = %repo,
            command = %invocation.display(),
            output = %output.output.trim_end(),
            "{} succeeded",
            step.label()
        );
        Ok(output)
    }
}
