//! Fixed-size worker pool draining the repository queue

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::git::{Mirror, MirrorOutcome};
use crate::repo::RepoRef;

/// Number of workers when none is configured
pub const DEFAULT_WORKERS: usize = 8;

/// Per-worker counts, summed into the run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerTally {
    /// Mirrors created by clone
    pub cloned: usize,
    /// Mirrors fetched and compacted
    pub updated: usize,
    /// Repositories whose processing stopped at an error
    pub failed: usize,
}

impl WorkerTally {
    /// Repositories this tally accounts for
    pub fn processed(&self) -> usize {
        self.cloned + self.updated + self.failed
    }

    fn record(&mut self, result: &crate::Result<MirrorOutcome>) {
        match result {
            Ok(MirrorOutcome::Cloned) => self.cloned += 1,
            Ok(MirrorOutcome::Updated) => self.updated += 1,
            Err(_) => self.failed += 1,
        }
    }
}

impl std::ops::AddAssign for WorkerTally {
    fn add_assign(&mut self, other: Self) {
        self.cloned += other.cloned;
        self.updated += other.updated;
        self.failed += other.failed;
    }
}

/// N workers sharing one queue of repositories
#[derive(Debug, Clone, Copy)]
pub struct DispatchPool {
    workers: usize,
}

impl DispatchPool {
    /// Create a pool of `workers` workers; zero is raised to one
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Number of workers
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queue capacity that keeps every worker fed without unbounded buffering
    pub fn queue_capacity(&self) -> usize {
        self.workers * 2
    }

    /// Start the workers on `rx`
    ///
    /// Each queued repository is received by exactly one worker. Workers exit
    /// once the queue is closed and drained; join the returned set to wait
    /// for all of them.
    pub fn spawn(&self, rx: mpsc::Receiver<RepoRef>, mirror: Arc<Mirror>) -> JoinSet<WorkerTally> {
        let rx = Arc::new(Mutex::new(rx));
        let mut set = JoinSet::new();

        for id in 0..self.workers {
            let rx = Arc::clone(&rx);
            let mirror = Arc::clone(&mirror);
            set.spawn(worker(id, rx, mirror));
        }

        info!(workers = self.workers, "Dispatch pool started");
        set
    }
}

impl Default for DispatchPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

async fn worker(id: usize, rx: Arc<Mutex<mpsc::Receiver<RepoRef>>>, mirror: Arc<Mirror>) -> WorkerTally {
    let mut tally = WorkerTally::default();

    loop {
        // Guard is released before the mirror operation runs
        let next = rx.lock().await.recv().await;
        let Some(repo) = next else {
            break;
        };

        let result = mirror.sync(&repo).await;
        if let Err(ref e) = result {
            error!(repo = %repo, worker = id, error = %e, "Mirroring failed");
        }
        tally.record(&result);
    }

    debug!(worker = id, processed = tally.processed(), "Worker finished");
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitCommands;
    use crate::repo::MirrorLayout;
    use crate::test_support::{repo, FakeGit, Script};
    use std::time::Duration;
    use tempfile::TempDir;

    async fn drain(pool: DispatchPool, mirror: Arc<Mirror>, names: &[String]) -> WorkerTally {
        let (tx, rx) = mpsc::channel(pool.queue_capacity());
        let mut set = pool.spawn(rx, mirror);

        for name in names {
            tx.send(repo(name)).await.unwrap();
        }
        drop(tx);

        let mut total = WorkerTally::default();
        while let Some(joined) = set.join_next().await {
            total += joined.unwrap();
        }
        total
    }

    fn names(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("org{}/repo{}", i % 3, i)).collect()
    }

    #[test]
    fn test_pool_sizing() {
        assert_eq!(DispatchPool::default().workers(), 8);
        assert_eq!(DispatchPool::default().queue_capacity(), 16);
        assert_eq!(DispatchPool::new(0).workers(), 1);
    }

    #[tokio::test]
    async fn test_every_repo_processed_exactly_once() {
        for workers in [1, 2, 8] {
            for count in [0, 1, 7, 40] {
                let temp = TempDir::new().unwrap();
                let git = Arc::new(FakeGit::new());
                let mirror = Arc::new(Mirror::new(
                    MirrorLayout::new(temp.path()),
                    GitCommands::default(),
                    git.clone(),
                ));
                let names = names(count);

                let tally = drain(DispatchPool::new(workers), mirror, &names).await;

                assert_eq!(tally.processed(), count, "workers={workers} count={count}");
                assert_eq!(tally.cloned, count);
                assert_eq!(git.count("clone"), count);
                for name in &names {
                    assert_eq!(git.subcommands_for(name), vec!["clone"], "{name}");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_single_worker_runs_one_at_a_time() {
        let temp = TempDir::new().unwrap();
        let git = Arc::new(FakeGit::new().with_delay(Duration::from_millis(5)));
        let mirror = Arc::new(Mirror::new(
            MirrorLayout::new(temp.path()),
            GitCommands::default(),
            git.clone(),
        ));

        let tally = drain(DispatchPool::new(1), mirror, &names(4)).await;

        assert_eq!(tally.processed(), 4);
        assert_eq!(git.peak_concurrency(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let temp = TempDir::new().unwrap();
        let git = Arc::new(FakeGit::new().fail("org1/repo1", "clone", Script::Exit(128)));
        let mirror = Arc::new(Mirror::new(
            MirrorLayout::new(temp.path()),
            GitCommands::default(),
            git.clone(),
        ));

        let tally = drain(DispatchPool::new(2), mirror, &names(6)).await;

        assert_eq!(tally.failed, 1);
        assert_eq!(tally.cloned, 5);
        for name in names(6).iter().filter(|n| *n != "org1/repo1") {
            assert!(temp.path().join(format!("{}.git", name)).is_dir(), "{name}");
        }
        assert!(!temp.path().join("org1/repo1.git").exists());
    }

    #[tokio::test]
    async fn test_directory_failure_is_isolated() {
        let temp = TempDir::new().unwrap();
        // A file where org0's directory should go
        std::fs::write(temp.path().join("org0"), "").unwrap();
        let git = Arc::new(FakeGit::new());
        let mirror = Arc::new(Mirror::new(
            MirrorLayout::new(temp.path()),
            GitCommands::default(),
            git.clone(),
        ));

        let tally = drain(DispatchPool::new(3), mirror, &names(6)).await;

        // repo0 and repo3 live under org0
        assert_eq!(tally.failed, 2);
        assert_eq!(tally.cloned, 4);
        assert_eq!(git.count("clone"), 4);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_by_worker_count() {
        let temp = TempDir::new().unwrap();
        let git = Arc::new(FakeGit::new().with_delay(Duration::from_millis(20)));
        let mirror = Arc::new(Mirror::new(
            MirrorLayout::new(temp.path()),
            GitCommands::default(),
            git.clone(),
        ));

        let tally = drain(DispatchPool::new(3), mirror, &names(12)).await;

        assert_eq!(tally.processed(), 12);
        // Every worker is busy at once, and never more than that
        assert_eq!(git.peak_concurrency(), 3);
    }
}
