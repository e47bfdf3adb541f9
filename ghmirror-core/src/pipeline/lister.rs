//! Paginated repository listing

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::repo::RepoRef;
use crate::Result;

/// First page number of the listing API
pub const FIRST_PAGE: u32 = 1;

/// One page of listing results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoPage {
    /// Repositories on this page, in server order
    pub repos: Vec<RepoRef>,
    /// Page number the server reported as next; 0 when there is none
    pub next_page: u32,
}

/// A remote that can list the repositories visible to a credential
#[async_trait]
pub trait RepoSource: Send + Sync {
    /// Fetch one page of the listing
    async fn list_page(&self, page: u32) -> Result<RepoPage>;
}

/// Walk every page of `source`, pushing each repository into `tx`
///
/// Stops after the first page whose reported next page does not advance past
/// the current one. Returns the number of repositories queued. Any listing
/// error is returned as-is and ends the walk; `tx` is dropped on return,
/// which closes the queue.
pub async fn list_repos<S>(source: &S, tx: mpsc::Sender<RepoRef>) -> Result<usize>
where
    S: RepoSource + ?Sized,
{
    let mut page = FIRST_PAGE;
    let mut queued = 0usize;

    loop {
        let RepoPage { repos, next_page } = source.list_page(page).await?;
        debug!(page, count = repos.len(), next_page, "Fetched repository page");

        for repo in repos {
            if tx.send(repo).await.is_err() {
                debug!(page, "Queue closed by consumers, stopping listing");
                return Ok(queued);
            }
            queued += 1;
        }

        if next_page <= page {
            break;
        }
        page = next_page;
    }

    info!(count = queued, pages = page, "Listed repositories");
    Ok(queued)
}
