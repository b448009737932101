//! Upstream release sources

pub mod github;

pub use github::GitHubReleases;

#[cfg(test)]
use mockall::automock;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("repository not found: {0}")]
    NotFound(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Source of latest-release tags for upstream repositories.
///
/// The reconciliation engine only ever calls this through a trait object, so
/// tests can substitute canned tags without touching the network. Failures
/// are reported per lookup and degrade to "latest unknown" at the call site.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetch the latest published release tag for a repository.
    ///
    /// # Returns
    /// * `Ok(Some(tag))` - raw tag of the latest release
    /// * `Ok(None)` - the repository has no published releases
    /// * `Err(RegistryError)` - the lookup failed
    async fn latest_tag(&self, repo: &str) -> Result<Option<String>, RegistryError>;
}
