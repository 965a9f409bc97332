//! Per-version extraction: pull, probe, parse, persist, remove

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::{ArchiveConfig, LOCK_FILE_NAME, MANIFEST_FILE_NAME};
use crate::container::error::ExtractError;
use crate::container::probe::{NOT_FOUND_MARKER, ProbeOutput, parse_probe_output, probe_script};
use crate::container::runtime::ContainerRuntime;
use crate::version::identity::VersionIdentity;
use crate::version::registry::Registry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Both artifacts were already archived
    Skipped,
    Extracted {
        directory: PathBuf,
        /// Directory the probe found the Gemfile in
        source_dir: Option<String>,
    },
}

/// Versions handled by a batch run that finished without failures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub extracted: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct Extractor {
    config: Arc<ArchiveConfig>,
    registry: Arc<dyn Registry>,
    runtime: Arc<dyn ContainerRuntime>,
}

impl Extractor {
    pub fn new(
        config: Arc<ArchiveConfig>,
        registry: Arc<dyn Registry>,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            config,
            registry,
            runtime,
        }
    }

    /// Extracts the Gemfile pair of one version into the archive.
    ///
    /// A no-op when the pair is already archived. The image is removed
    /// afterwards whatever the outcome. Anything other than a strict `N.N.N`
    /// version is rejected before the runtime is touched.
    pub async fn extract_version(&self, version: &str) -> Result<ExtractOutcome, ExtractError> {
        let identity = VersionIdentity::parse(version)
            .ok_or_else(|| ExtractError::InvalidVersion(version.to_string()))?;

        if identity.exists_locally(&self.config.archive_root) {
            info!("Skipping {}: already extracted", version);
            return Ok(ExtractOutcome::Skipped);
        }

        let image = self.config.image_ref(version);
        let result = self.pull_and_extract(&identity, &image).await;
        self.remove_image(&image).await;

        result
    }

    /// Extracts every remote version in order, collecting failures.
    ///
    /// Returns [`ExtractError::Batch`] after the full pass if any version failed.
    pub async fn extract_all(&self) -> Result<BatchReport, ExtractError> {
        let versions = self.registry.fetch_all_versions().await?;
        let total = versions.len();
        info!("Extracting {} versions of {}", total, self.config.repository);

        let mut report = BatchReport::default();
        let mut failed = Vec::new();

        for (position, version) in versions.into_iter().enumerate() {
            debug!("[{}/{}] {}", position + 1, total, version);

            match self.extract_version(&version).await {
                Ok(ExtractOutcome::Skipped) => report.skipped.push(version),
                Ok(ExtractOutcome::Extracted { .. }) => report.extracted.push(version),
                Err(e) => {
                    error!("Failed to extract {}: {}", version, e);
                    failed.push(version);
                }
            }
        }

        if !failed.is_empty() {
            return Err(ExtractError::Batch {
                count: failed.len(),
                versions: failed,
            });
        }

        info!(
            "Extracted {} versions, {} already present",
            report.extracted.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    async fn pull_and_extract(
        &self,
        identity: &VersionIdentity,
        image: &str,
    ) -> Result<ExtractOutcome, ExtractError> {
        let version = identity.number();

        info!("Pulling {}", image);
        let pull = self.runtime.pull_image(image).await?;
        if !pull.is_success() {
            return Err(ExtractError::PullFailed {
                image: image.to_string(),
                status: pull.status,
                output: pull.combined(),
            });
        }

        let run = self.runtime.run_with_script(image, &probe_script()).await?;
        if !run.is_success() || run.stdout.contains(NOT_FOUND_MARKER) {
            return Err(ExtractError::ProbeFailed {
                version: version.to_string(),
                status: run.status,
                output: run.combined(),
            });
        }

        let probe = parse_probe_output(&run.stdout).map_err(|source| ExtractError::Protocol {
            version: version.to_string(),
            source,
            output: run.combined(),
        })?;

        let directory = write_artifacts(&self.config.archive_root, identity, &probe)?;
        info!(
            "Extracted {} to {:?} (Gemfile found in {})",
            version,
            directory,
            probe.source_dir.as_deref().unwrap_or("an unreported directory")
        );

        Ok(ExtractOutcome::Extracted {
            directory,
            source_dir: probe.source_dir,
        })
    }

    async fn remove_image(&self, image: &str) {
        match self.runtime.remove_images(&[image.to_string()]).await {
            Ok(output) if output.is_success() => debug!("Removed image {}", image),
            Ok(output) => warn!(
                "Failed to remove image {}: {}",
                image,
                output.combined().trim()
            ),
            Err(e) => warn!("Failed to remove image {}: {}", image, e),
        }
    }
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExtractError + '_ {
    move |source| ExtractError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes both artifacts under `v<version>/`.
///
/// A fresh pair is staged in a hidden directory and renamed into place, so
/// the version directory never appears half written. A directory left over
/// with a single file is completed in place.
fn write_artifacts(
    archive_root: &Path,
    identity: &VersionIdentity,
    probe: &ProbeOutput,
) -> Result<PathBuf, ExtractError> {
    let destination = identity.directory(archive_root);

    if destination.is_dir() {
        write_file_atomically(&destination, MANIFEST_FILE_NAME, &probe.manifest_file_content())?;
        write_file_atomically(&destination, LOCK_FILE_NAME, &probe.lock_file_content())?;
        return Ok(destination);
    }

    std::fs::create_dir_all(archive_root).map_err(write_error(archive_root))?;

    let staging = tempfile::Builder::new()
        .prefix(&format!(".{}-", identity.dir_name()))
        .tempdir_in(archive_root)
        .map_err(write_error(archive_root))?;

    for (name, content) in [
        (MANIFEST_FILE_NAME, probe.manifest_file_content()),
        (LOCK_FILE_NAME, probe.lock_file_content()),
    ] {
        let path = staging.path().join(name);
        std::fs::write(&path, content).map_err(write_error(&path))?;
    }

    std::fs::rename(staging.path(), &destination).map_err(write_error(&destination))?;

    Ok(destination)
}

fn write_file_atomically(directory: &Path, name: &str, content: &str) -> Result<(), ExtractError> {
    let path = directory.join(name);
    let mut staged = tempfile::NamedTempFile::new_in(directory).map_err(write_error(&path))?;
    std::io::Write::write_all(&mut staged, content.as_bytes()).map_err(write_error(&path))?;
    staged.persist(&path).map_err(|e| write_error(&path)(e.error))?;
    Ok(())
}
