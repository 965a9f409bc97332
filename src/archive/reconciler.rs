//! Reconciliation of the local archive with the remote catalog

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::archive::error::ReconcileError;
use crate::archive::index::{IndexMetadata, LocalIndex, MergeSummary};
use crate::config::ArchiveConfig;
use crate::version::identity::VersionIdentity;
use crate::version::registry::Registry;

/// Outcome of one index generation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub metadata: IndexMetadata,
    pub missing_versions: Vec<String>,
    pub merge: MergeSummary,
}

/// Merges the archive root, the existing index and the remote catalog
pub struct Reconciler {
    config: Arc<ArchiveConfig>,
    registry: Arc<dyn Registry>,
}

impl Reconciler {
    pub fn new(config: Arc<ArchiveConfig>, registry: Arc<dyn Registry>) -> Self {
        Self { config, registry }
    }

    /// Rebuilds the index file from the archive root and the remote catalog
    pub async fn generate_index(&self) -> Result<IndexSummary, ReconcileError> {
        let remote = self.registry.fetch_all_versions().await?;
        info!(
            "Found {} remote versions of {}",
            remote.len(),
            self.config.repository
        );

        let local = scan_archive(&self.config.archive_root)?;
        info!(
            "Found {} extracted versions in {:?}",
            local.len(),
            self.config.archive_root
        );

        let mut index = LocalIndex::load(&self.config.index_path())?;
        let merge = index.merge(&local);
        if !merge.added.is_empty() {
            info!("Newly indexed: {}", merge.added.join(", "));
        }
        if !merge.dropped.is_empty() {
            warn!(
                "No longer on disk, removed from index: {}",
                merge.dropped.join(", ")
            );
        }

        let missing = missing_versions(&remote, &local);
        index.set_missing_versions(missing.clone());
        let metadata = index.save(remote.len())?;

        Ok(IndexSummary {
            metadata,
            missing_versions: missing,
            merge,
        })
    }
}

/// Lists every complete version directory under `archive_root`, oldest first.
///
/// Each identity carries the modification time of its directory. A directory
/// holding only one of the two artifact files is skipped with a warning. A
/// missing archive root yields no versions.
pub fn scan_archive(archive_root: &Path) -> Result<Vec<VersionIdentity>, ReconcileError> {
    let scan_error = |source| ReconcileError::Scan {
        path: archive_root.to_path_buf(),
        source,
    };

    if !archive_root.exists() {
        debug!("Archive root {:?} does not exist yet", archive_root);
        return Ok(Vec::new());
    }

    let mut versions = Vec::new();

    for entry in std::fs::read_dir(archive_root).map_err(scan_error)? {
        let entry = entry.map_err(scan_error)?;
        let file_type = entry.file_type().map_err(scan_error)?;
        if !file_type.is_dir() {
            continue;
        }

        let name = entry.file_name();
        let Some(version) = name.to_str().and_then(VersionIdentity::from_dir_name) else {
            continue;
        };

        if !version.exists_locally(archive_root) {
            let has_manifest = version.manifest_path(archive_root).is_file();
            let has_lock = version.lock_path(archive_root).is_file();
            if has_manifest || has_lock {
                warn!(
                    "Skipping {:?}: incomplete artifact pair (Gemfile: {}, Gemfile.lock: {})",
                    entry.path(),
                    has_manifest,
                    has_lock
                );
            } else {
                debug!("Skipping {:?}: no artifacts", entry.path());
            }
            continue;
        }

        let modified = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .map_err(scan_error)?;

        versions.push(version.with_updated_at(DateTime::<Utc>::from(modified)));
    }

    versions.sort();
    Ok(versions)
}

/// Remote versions without a local artifact pair, in remote order
pub fn missing_versions(remote: &[String], local: &[VersionIdentity]) -> Vec<String> {
    let local: HashSet<&str> = local.iter().map(VersionIdentity::number).collect();

    remote
        .iter()
        .filter(|version| !local.contains(version.as_str()))
        .cloned()
        .collect()
}
