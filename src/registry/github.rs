//! GitHub Releases API release source

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::registry::{RegistryError, ReleaseSource};

/// Default base URL for GitHub API
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// One unreachable upstream must not stall the whole run.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Response from GitHub Releases API. Some projects leave `tag_name` empty
/// and only fill the release `name`.
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: Option<String>,
    name: Option<String>,
}

/// Release source backed by the GitHub Releases API (`releases/latest`).
pub struct GitHubReleases {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubReleases {
    /// Creates a new GitHubReleases with a custom base URL and an optional
    /// bearer token for authenticated rate limits.
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("pgextver")
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
            token,
        }
    }
}

impl Default for GitHubReleases {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, None)
    }
}

#[async_trait::async_trait]
impl ReleaseSource for GitHubReleases {
    async fn latest_tag(&self, repo: &str) -> Result<Option<String>, RegistryError> {
        let url = format!("{}/repos/{}/releases/latest", self.base_url, repo);

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(repo.to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(RegistryError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            warn!("GitHub API returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let release: Release = response.json().await.map_err(|e| {
            warn!("Failed to parse GitHub release response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        Ok(release.tag_name.or(release.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn latest_tag_returns_tag_name() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/postgis/postgis/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tag_name": "3.4.1", "name": "PostGIS 3.4.1"}"#)
            .create_async()
            .await;

        let source = GitHubReleases::new(&server.url(), None);
        let tag = source.latest_tag("postgis/postgis").await.unwrap();

        mock.assert_async().await;
        assert_eq!(tag, Some("3.4.1".to_string()));
    }

    #[tokio::test]
    async fn latest_tag_falls_back_to_release_name() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/some/repo/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tag_name": null, "name": "v1.2.0"}"#)
            .create_async()
            .await;

        let source = GitHubReleases::new(&server.url(), None);
        let tag = source.latest_tag("some/repo").await.unwrap();

        mock.assert_async().await;
        assert_eq!(tag, Some("v1.2.0".to_string()));
    }

    #[tokio::test]
    async fn latest_tag_sends_bearer_token_when_configured() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/postgis/postgis/releases/latest")
            .match_header("authorization", "Bearer sekrit")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tag_name": "3.4.1", "name": null}"#)
            .create_async()
            .await;

        let source = GitHubReleases::new(&server.url(), Some("sekrit".to_string()));
        let tag = source.latest_tag("postgis/postgis").await.unwrap();

        mock.assert_async().await;
        assert_eq!(tag, Some("3.4.1".to_string()));
    }

    #[tokio::test]
    async fn latest_tag_returns_not_found_for_missing_repo() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/nonexistent/repo/releases/latest")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let source = GitHubReleases::new(&server.url(), None);
        let result = source.latest_tag("nonexistent/repo").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }

    #[tokio::test]
    async fn latest_tag_returns_rate_limited_for_429() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/postgis/postgis/releases/latest")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_header("retry-after", "60")
            .with_body(r#"{"message": "API rate limit exceeded"}"#)
            .create_async()
            .await;

        let source = GitHubReleases::new(&server.url(), None);
        let result = source.latest_tag("postgis/postgis").await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(RegistryError::RateLimited {
                retry_after_secs: Some(60)
            })
        ));
    }

    #[tokio::test]
    async fn latest_tag_returns_invalid_response_for_bad_payload() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/some/repo/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let source = GitHubReleases::new(&server.url(), None);
        let result = source.latest_tag("some/repo").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::InvalidResponse(_))));
    }
}
