//! One-time git credential cache provisioning
//!
//! Configures git's `cache` credential helper globally and primes it with the
//! account token, so that `git clone` over HTTPS authenticates without a
//! prompt for the rest of the run.

use std::fmt;

use tracing::info;

use super::command::{CommandRunner, Invocation};
use crate::{Error, Result};

/// Username GitHub accepts alongside a token as password
const TOKEN_USERNAME: &str = "oauth2";

/// A credential to hand to `git credential approve`
#[derive(Clone)]
pub struct CredentialSeed {
    /// Transport protocol, normally `https`
    pub protocol: String,
    /// Forge host, e.g. `github.com`
    pub host: String,
    /// Username git presents
    pub username: String,
    /// The token
    pub password: String,
}

impl CredentialSeed {
    /// Seed for a token on an HTTPS forge host
    pub fn for_token(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            protocol: "https".to_string(),
            host: host.into(),
            username: TOKEN_USERNAME.to_string(),
            password: token.into(),
        }
    }

    /// Body of the `git credential` stdin protocol
    pub fn to_credential_input(&self) -> String {
        format!(
            "protocol={}\nhost={}\nusername={}\npassword={}\n",
            self.protocol, self.host, self.username, self.password
        )
    }
}

impl fmt::Debug for CredentialSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSeed")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configure the cache helper and prime it with `seed`
///
/// Both steps are fatal on failure: later clones over the same transport
/// would fail anyway.
pub async fn provision(runner: &dyn CommandRunner, git_path: &str, seed: &CredentialSeed) -> Result<()> {
    let configure = Invocation::new(git_path).args(["config", "--global", "credential.helper", "cache"]);
    run_checked(runner, &configure).await?;

    let approve = Invocation::new(git_path)
        .args(["credential", "approve"])
        .stdin(seed.to_credential_input());
    run_checked(runner, &approve).await?;

    info!(host = %seed.host, "Git credential cache primed");
    Ok(())
}

async fn run_checked(runner: &dyn CommandRunner, invocation: &Invocation) -> Result<()> {
    let output = runner
        .run(invocation)
        .await
        .map_err(|e| Error::Credential(format!("{}: {}", invocation.display(), e)))?;

    if !output.success {
        return Err(Error::Credential(format!(
            "{} ({}): {}",
            invocation.display(),
            output.status_line(),
            output.output.trim_end()
        )));
    }

    Ok(())
}
