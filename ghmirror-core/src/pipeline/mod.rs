//! The mirroring pipeline
//!
//! A single lister feeds a bounded queue that a fixed pool of workers
//! drains. The orchestrator owns the queue and the join barrier for one run.

mod lister;
mod orchestrator;
mod pool;

pub use lister::{list_repos, RepoPage, RepoSource, FIRST_PAGE};
pub use orchestrator::{Orchestrator, RunSummary};
pub use pool::{DispatchPool, WorkerTally, DEFAULT_WORKERS};
