//! ghmirror Core - mirroring pipeline for every repository of a forge account
//!
//! This crate lists repositories through a [`RepoSource`], and keeps a bare
//! mirror of each one on disk by cloning new repositories and fetching and
//! compacting existing ones, with a bounded pool of concurrent workers.

pub mod config;
pub mod error;
pub mod git;
pub mod pipeline;
pub mod repo;
pub mod secrets;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{Error, Result};
pub use git::{CommandRunner, CredentialSeed, Mirror, SystemRunner};
pub use pipeline::{Orchestrator, RepoPage, RepoSource, RunSummary};
pub use repo::{MirrorLayout, RepoRef};
pub use secrets::Secrets;
