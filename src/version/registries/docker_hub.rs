//! Docker Hub tags API registry implementation

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{DEFAULT_PAGE_SIZE, DEFAULT_REGISTRY_URL, DEFAULT_REPOSITORY};
use crate::version::error::RegistryError;
use crate::version::identity::{is_release_version, sort_versions};
use crate::version::registry::Registry;

/// One page of the tags listing
#[derive(Debug, Deserialize)]
struct TagPage {
    #[serde(default)]
    results: Vec<Tag>,
    /// Absolute URL of the next page, null on the last one
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

/// Registry implementation for the Docker Hub v2 repositories API
pub struct DockerHubRegistry {
    client: reqwest::Client,
    base_url: String,
    repository: String,
    page_size: u32,
}

impl DockerHubRegistry {
    /// Creates a new DockerHubRegistry with a custom base URL
    pub fn new(base_url: &str, repository: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("gemfile-archiver")
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            repository: repository.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    fn first_page_url(&self) -> String {
        format!(
            "{}/v2/repositories/{}/tags?page_size={}",
            self.base_url, self.repository, self.page_size
        )
    }

    async fn fetch_page(&self, url: &str) -> Result<TagPage, RegistryError> {
        debug!("Fetching tags page: {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(self.repository.clone()));
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
            warn!("Docker Hub returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        response.json().await.map_err(|e| {
            warn!("Failed to parse Docker Hub tags response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })
    }
}

impl Default for DockerHubRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL, DEFAULT_REPOSITORY)
    }
}

#[async_trait::async_trait]
impl Registry for DockerHubRegistry {
    async fn fetch_all_versions(&self) -> Result<Vec<String>, RegistryError> {
        let mut versions = Vec::new();
        let mut seen = HashSet::new();
        let mut next_url = Some(self.first_page_url());
        let mut pages = 0;

        while let Some(url) = next_url.take() {
            let page = self.fetch_page(&url).await?;
            pages += 1;

            for tag in page.results {
                if is_release_version(&tag.name) && seen.insert(tag.name.clone()) {
                    versions.push(tag.name);
                }
            }

            next_url = page.next.filter(|next| !next.is_empty());
        }

        sort_versions(&mut versions);
        debug!(
            "Fetched {} release versions of {} in {} pages",
            versions.len(),
            self.repository,
            pages
        );

        Ok(versions)
    }
}
