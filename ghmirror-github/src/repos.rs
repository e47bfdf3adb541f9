//! Repository listing for the authenticated account

use async_trait::async_trait;
use ghmirror_core::{RepoPage, RepoRef, RepoSource};
use octocrab::Page;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::map_api_error;
use crate::GitHubClient;

/// Items requested per page; the maximum the API allows
pub const PER_PAGE: u8 = 100;

/// Route listing every repository the token can see
const USER_REPOS_ROUTE: &str = "/user/repos";

/// The only repository fields the mirror needs
#[derive(Debug, Clone, Deserialize)]
struct ApiRepo {
    full_name: Option<String>,
    clone_url: Option<String>,
}

impl ApiRepo {
    fn into_ref(self) -> Option<RepoRef> {
        match (self.full_name, self.clone_url) {
            (Some(full_name), Some(clone_url)) => Some(RepoRef::new(full_name, clone_url)),
            (full_name, _) => {
                warn!(repo = ?full_name, "Skipping repository without name or clone URL");
                None
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ListParams {
    page: u32,
    per_page: u8,
}

/// Extract the `page` query parameter of a pagination link
///
/// Returns 0 when there is no link or it carries no usable page number.
fn page_number(query: Option<&str>) -> u32 {
    query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(key, _)| key == "page")
                .and_then(|(_, value)| value.parse().ok())
        })
        .unwrap_or(0)
}

fn into_repo_page(items: Vec<ApiRepo>, next_query: Option<&str>) -> RepoPage {
    RepoPage {
        repos: items.into_iter().filter_map(ApiRepo::into_ref).collect(),
        next_page: page_number(next_query),
    }
}

impl GitHubClient {
    /// Fetch one page of the authenticated account's repositories
    pub async fn list_repos_page(&self, page: u32) -> crate::Result<RepoPage> {
        let params = ListParams {
            page,
            per_page: PER_PAGE,
        };

        let response: Page<ApiRepo> = self
            .client()
            .get(USER_REPOS_ROUTE, Some(&params))
            .await
            .map_err(map_api_error)?;

        let next_query = response.next.as_ref().and_then(|uri| uri.query());
        let repo_page = into_repo_page(response.items, next_query);

        debug!(page, count = repo_page.repos.len(), next_page = repo_page.next_page, "Listed repository page");
        Ok(repo_page)
    }
}

#[async_trait]
impl RepoSource for GitHubClient {
    async fn list_page(&self, page: u32) -> ghmirror_core::Result<RepoPage> {
        Ok(self.list_repos_page(page).await?)
    }
}
