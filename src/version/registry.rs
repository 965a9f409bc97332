//! Registry trait for fetching the published versions of an image repository

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;

/// Trait for fetching release versions from a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches every release version published for the repository
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - `N.N.N` versions, ordered from oldest to newest
    /// * `Err(RegistryError)` - If any page fails to download or decode
    async fn fetch_all_versions(&self) -> Result<Vec<String>, RegistryError>;
}
