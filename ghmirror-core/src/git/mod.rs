//! Git operations for ghmirror
//!
//! This module provides the command capability, the per-repository mirror
//! operation and credential cache provisioning.

mod command;
mod credential;
mod mirror;

pub use command::{CommandOutput, CommandRunner, Invocation, SystemRunner};
pub use credential::{provision, CredentialSeed};
pub use mirror::{GitCommands, Mirror, MirrorOutcome, MirrorState};
