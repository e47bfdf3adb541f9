//! ghmirror GitHub - GitHub integration for ghmirror
//!
//! This crate lists the repositories visible to a personal access token and
//! exposes them to the mirroring pipeline as a [`ghmirror_core::RepoSource`].

mod client;
mod error;
mod repos;

pub use client::GitHubClient;
pub use error::{Error, Result};
pub use repos::PER_PAGE;
