//! Registry test utilities

use std::sync::Mutex;

use async_trait::async_trait;

use gemfile_archiver::version::error::RegistryError;
use gemfile_archiver::version::registry::Registry;

/// Mock registry serving a fixed version list
pub struct MockRegistry {
    versions: Mutex<Option<Vec<String>>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self {
            versions: Mutex::new(None),
        }
    }

    pub fn with_versions(self, versions: Vec<&str>) -> Self {
        self.set_versions(versions);
        self
    }

    /// Replaces the published versions between runs
    pub fn set_versions(&self, versions: Vec<&str>) {
        *self.versions.lock().unwrap() =
            Some(versions.into_iter().map(|v| v.to_string()).collect());
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn fetch_all_versions(&self) -> Result<Vec<String>, RegistryError> {
        match self.versions.lock().unwrap().clone() {
            Some(versions) => Ok(versions),
            None => Err(RegistryError::NotFound("metanorma/metanorma".to_string())),
        }
    }
}
