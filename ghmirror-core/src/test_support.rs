//! Fakes shared by the unit tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::git::{CommandOutput, CommandRunner, Invocation};
use crate::pipeline::{RepoPage, RepoSource};
use crate::repo::RepoRef;
use crate::{Error, Result};

/// How a scripted invocation should fail
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// The command runs and exits with this code
    Exit(i32),
    /// The command cannot be started
    SpawnError,
}

/// Simulates git: `clone` creates the target directory, everything else
/// succeeds unless scripted to fail. Every invocation is recorded.
#[derive(Default)]
pub struct FakeGit {
    calls: Mutex<Vec<Invocation>>,
    per_repo: HashMap<(String, String), Script>,
    any_repo: HashMap<String, Script>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `subcommand` for the mirror of `full_name`
    pub fn fail(mut self, full_name: &str, subcommand: &str, script: Script) -> Self {
        self.per_repo
            .insert((full_name.to_string(), subcommand.to_string()), script);
        self
    }

    /// Fail `subcommand` wherever it runs
    pub fn fail_any(mut self, subcommand: &str, script: Script) -> Self {
        self.any_repo.insert(subcommand.to_string(), script);
        self
    }

    /// Make every invocation take `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Subcommands run against the mirror of `full_name`, in order
    pub fn subcommands_for(&self, full_name: &str) -> Vec<String> {
        self.invocations()
            .iter()
            .filter(|inv| repo_of(inv).as_deref() == Some(full_name))
            .filter_map(|inv| inv.subcommand().map(str::to_string))
            .collect()
    }

    /// Number of invocations of `subcommand`
    pub fn count(&self, subcommand: &str) -> usize {
        self.invocations()
            .iter()
            .filter(|inv| inv.subcommand() == Some(subcommand))
            .count()
    }

    /// Highest number of invocations observed running at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Recover `owner/name` from the mirror path an invocation targets
fn repo_of(inv: &Invocation) -> Option<String> {
    let path = match inv.subcommand() {
        Some("clone") => inv.args.last().map(Path::new)?,
        _ => inv.cwd.as_deref()?,
    };
    let name = path.file_name()?.to_str()?.strip_suffix(".git")?;
    let owner = path.parent()?.file_name()?.to_str()?;
    Some(format!("{}/{}", owner, name))
}

#[async_trait]
impl CommandRunner for FakeGit {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(invocation.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let subcommand = invocation.subcommand().unwrap_or_default().to_string();
        let script = repo_of(invocation)
            .and_then(|repo| self.per_repo.get(&(repo, subcommand.clone())))
            .or_else(|| self.any_repo.get(&subcommand))
            .copied();

        match script {
            Some(Script::SpawnError) => Err(Error::Other("Executable not found: 'git'".into())),
            Some(Script::Exit(code)) => Ok(CommandOutput::failed(
                code,
                format!("fatal: scripted {} failure", subcommand),
            )),
            None => {
                if subcommand == "clone" {
                    if let Some(target) = invocation.args.last() {
                        std::fs::create_dir_all(target)?;
                    }
                }
                Ok(CommandOutput::ok(""))
            }
        }
    }
}

/// Serves a fixed list of pages; page numbers start at 1
pub struct FakeSource {
    pages: Vec<RepoPage>,
    fail_on: Option<u32>,
    requested: Mutex<Vec<u32>>,
}

impl FakeSource {
    pub fn new(pages: Vec<RepoPage>) -> Self {
        Self {
            pages,
            fail_on: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    /// A single page holding `names`
    pub fn single(names: &[&str]) -> Self {
        Self::new(vec![page(names, 0)])
    }

    /// Fail the request for `page`
    pub fn failing_on(mut self, page: u32) -> Self {
        self.fail_on = Some(page);
        self
    }

    pub fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

/// Build a page of repositories named `names` that points at `next_page`
pub fn page(names: &[&str], next_page: u32) -> RepoPage {
    RepoPage {
        repos: names.iter().map(|n| repo(n)).collect(),
        next_page,
    }
}

pub fn repo(name: &str) -> RepoRef {
    RepoRef::new(name, format!("https://github.com/{}.git", name))
}

#[async_trait]
impl RepoSource for FakeSource {
    async fn list_page(&self, page: u32) -> Result<RepoPage> {
        self.requested.lock().unwrap().push(page);

        if self.fail_on == Some(page) {
            return Err(Error::Listing(format!("page {}: 502 Bad Gateway", page)));
        }

        let index = page.checked_sub(1).map(|i| i as usize);
        Ok(index
            .and_then(|i| self.pages.get(i))
            .cloned()
            .unwrap_or(RepoPage {
                repos: Vec::new(),
                next_page: 0,
            }))
    }
}
