//! Durable index of the local archive
//!
//! The index is a YAML document rewritten in full on every save:
//!
//! ```yaml
//! metadata:
//!   generated_at: 2024-05-01T10:00:00Z
//!   local_count: 2
//!   remote_count: 3
//!   latest_version: 1.1.0
//! missing_versions:
//! - 1.2.0
//! versions:
//! - version: 1.0.0
//!   updated_at: 2024-04-01T08:00:00Z
//! - version: 1.1.0
//!   updated_at: 2024-04-20T08:00:00Z
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::archive::error::IndexError;
use crate::version::identity::{VersionIdentity, max_version};

/// Summary written at the top of the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub generated_at: String,
    pub local_count: usize,
    pub remote_count: usize,
    pub latest_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub version: String,
    pub updated_at: String,
}

/// On-disk shape of the index file
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexDocument {
    #[serde(default)]
    metadata: Option<IndexMetadata>,
    #[serde(default)]
    missing_versions: Vec<String>,
    #[serde(default)]
    versions: Vec<IndexEntry>,
}

/// Result of merging the scanned archive into the index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Versions stamped for the first time
    pub added: Vec<String>,
    /// Versions whose existing timestamp was kept
    pub preserved: usize,
    /// Indexed versions no longer present on disk
    pub dropped: Vec<String>,
}

/// Formats a timestamp the way the index stores it: RFC 3339, UTC, `Z` suffix
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// In-memory view of the index file
#[derive(Debug, Clone)]
pub struct LocalIndex {
    path: PathBuf,
    metadata: Option<IndexMetadata>,
    missing_versions: Vec<String>,
    /// version -> updated_at, kept verbatim as read from disk
    versions: IndexMap<String, String>,
}

impl LocalIndex {
    /// Creates an empty index bound to `path`
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            metadata: None,
            missing_versions: Vec::new(),
            versions: IndexMap::new(),
        }
    }

    /// Loads the index at `path`, or returns an empty one if the file does not exist
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        if !path.exists() {
            debug!("No index at {:?}, starting empty", path);
            return Ok(Self::new(path));
        }

        let content = std::fs::read_to_string(path).map_err(|source| IndexError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let document: IndexDocument = if content.trim().is_empty() {
            IndexDocument::default()
        } else {
            serde_yaml_ng::from_str(&content).map_err(|source| IndexError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };

        let versions: IndexMap<String, String> = document
            .versions
            .into_iter()
            .map(|entry| (entry.version, entry.updated_at))
            .collect();

        debug!("Loaded {} indexed versions from {:?}", versions.len(), path);

        Ok(Self {
            path: path.to_path_buf(),
            metadata: document.metadata,
            missing_versions: document.missing_versions,
            versions,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Metadata from the last load or save
    pub fn metadata(&self) -> Option<&IndexMetadata> {
        self.metadata.as_ref()
    }

    pub fn missing_versions(&self) -> &[String] {
        &self.missing_versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn contains(&self, version: &str) -> bool {
        self.versions.contains_key(version)
    }

    /// Timestamp recorded for `version`
    pub fn updated_at(&self, version: &str) -> Option<&str> {
        self.versions.get(version).map(String::as_str)
    }

    /// Indexed entries in their current order
    pub fn entries(&self) -> impl Iterator<Item = IndexEntry> + '_ {
        self.versions.iter().map(|(version, updated_at)| IndexEntry {
            version: version.clone(),
            updated_at: updated_at.clone(),
        })
    }

    /// Replaces the indexed version set with `local`.
    ///
    /// Versions already indexed keep their timestamp. New ones take the
    /// identity's own timestamp, or the current time if it has none.
    pub fn merge(&mut self, local: &[VersionIdentity]) -> MergeSummary {
        let mut summary = MergeSummary::default();
        let mut merged = IndexMap::with_capacity(local.len());

        for version in local {
            let number = version.number();
            match self.versions.get(number) {
                Some(existing) => {
                    summary.preserved += 1;
                    merged.insert(number.to_string(), existing.clone());
                }
                None => {
                    let stamp = version.updated_at().unwrap_or_else(Utc::now);
                    summary.added.push(number.to_string());
                    merged.insert(number.to_string(), format_timestamp(stamp));
                }
            }
        }

        summary.dropped = self
            .versions
            .keys()
            .filter(|version| !merged.contains_key(*version))
            .cloned()
            .collect();

        self.versions = merged;
        summary
    }

    pub fn set_missing_versions(&mut self, missing: Vec<String>) {
        self.missing_versions = missing;
    }

    /// Writes the whole index with fresh metadata, replacing the file atomically
    pub fn save(&mut self, remote_count: usize) -> Result<IndexMetadata, IndexError> {
        self.save_at(remote_count, Utc::now())
    }

    fn save_at(
        &mut self,
        remote_count: usize,
        generated_at: DateTime<Utc>,
    ) -> Result<IndexMetadata, IndexError> {
        self.versions
            .sort_by_cached_key(|version, _| VersionIdentity::new(version.as_str()));

        let metadata = IndexMetadata {
            generated_at: format_timestamp(generated_at),
            local_count: self.versions.len(),
            remote_count,
            latest_version: max_version(self.versions.keys().map(String::as_str))
                .map(str::to_string),
        };

        let document = IndexDocument {
            metadata: Some(metadata.clone()),
            missing_versions: self.missing_versions.clone(),
            versions: self.entries().collect(),
        };
        let content = serde_yaml_ng::to_string(&document)?;

        self.write_atomically(&content)?;
        self.metadata = Some(metadata.clone());

        info!(
            "Wrote index {:?}: {} local, {} remote, {} missing",
            self.path,
            metadata.local_count,
            metadata.remote_count,
            self.missing_versions.len()
        );

        Ok(metadata)
    }

    fn write_atomically(&self, content: &str) -> Result<(), IndexError> {
        let write_error = |source| IndexError::Write {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(write_error)?;

        let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(write_error)?;
        staged
            .write_all(content.as_bytes())
            .and_then(|_| staged.as_file().sync_all())
            .map_err(write_error)?;
        staged
            .persist(&self.path)
            .map_err(|e| write_error(e.error))?;

        Ok(())
    }
}
