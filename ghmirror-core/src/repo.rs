//! Repository references and their on-disk mirror layout

use std::fmt;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::{Error, Result};

/// Suffix appended to a repository's full name to form its mirror directory
const MIRROR_SUFFIX: &str = ".git";

/// One remote repository, as reported by the listing API
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    /// `owner/name`, unique per account listing
    full_name: String,
    /// URL passed to `git clone --mirror`
    clone_url: String,
}

impl RepoRef {
    /// Create a new repository reference
    pub fn new(full_name: impl Into<String>, clone_url: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            clone_url: clone_url.into(),
        }
    }

    /// Get the `owner/name` of the repository
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Get the clone URL
    pub fn clone_url(&self) -> &str {
        &self.clone_url
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// Filesystem locations for one repository's mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorPaths {
    /// Directory holding all mirrors of the same owner
    pub org_dir: PathBuf,
    /// The bare mirror itself
    pub local_path: PathBuf,
}

/// Directory of a repository's owner, relative to the mirror root
///
/// Mirrors `dirname`: a name without a slash maps to the root itself.
pub fn org_dir_of(full_name: &str) -> PathBuf {
    Path::new(full_name)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Mirror directory of a repository, relative to the mirror root
pub fn local_path_of(full_name: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", full_name, MIRROR_SUFFIX))
}

/// Maps repository references onto directories under a mirror root
#[derive(Debug, Clone)]
pub struct MirrorLayout {
    root: PathBuf,
}

impl MirrorLayout {
    /// Create a layout rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Compute the paths for a repository without touching the filesystem
    pub fn paths_for(&self, repo: &RepoRef) -> Result<MirrorPaths> {
        validate_full_name(repo.full_name())?;

        Ok(MirrorPaths {
            org_dir: self.root.join(org_dir_of(repo.full_name())),
            local_path: self.root.join(local_path_of(repo.full_name())),
        })
    }

    /// Compute the paths for a repository and create its owner directory
    pub async fn resolve(&self, repo: &RepoRef) -> Result<MirrorPaths> {
        let paths = self.paths_for(repo)?;
        create_org_dir(&paths.org_dir).await?;
        Ok(paths)
    }
}

/// Reject names that would land outside the mirror root
fn validate_full_name(full_name: &str) -> Result<()> {
    if full_name.is_empty() {
        return Err(Error::InvalidName(full_name.to_string()));
    }

    let escapes = Path::new(full_name)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(Error::InvalidName(full_name.to_string()));
    }

    Ok(())
}

async fn create_org_dir(org_dir: &Path) -> Result<()> {
    if org_dir.as_os_str().is_empty() {
        return Ok(());
    }

    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);

    builder
        .create(org_dir)
        .await
        .map_err(|source| Error::DirectoryCreation {
            path: org_dir.to_path_buf(),
            source,
        })?;

    debug!(path = %org_dir.display(), "Owner directory ready");
    Ok(())
}
