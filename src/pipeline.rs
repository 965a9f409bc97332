//! The `extract-all` run: batch extraction, optional image cleanup, index refresh

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::archive::error::ReconcileError;
use crate::archive::reconciler::{IndexSummary, Reconciler};
use crate::config::ArchiveConfig;
use crate::container::error::ExtractError;
use crate::container::extractor::{BatchReport, Extractor};
use crate::container::janitor::{CleanupReport, ImageJanitor};
use crate::container::runtime::ContainerRuntime;
use crate::version::registry::Registry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractAllOptions {
    /// Remove stale images after the batch, keeping the newest
    pub cleanup: bool,
    /// Leave the index file untouched
    pub skip_index: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractAllReport {
    pub batch: BatchReport,
    pub cleanup: Option<CleanupReport>,
    pub index: Option<IndexSummary>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Extracts every missing version, then cleans up and refreshes the index.
///
/// Cleanup and the index run even when the batch failed, since the versions
/// that succeeded are already on disk. A cleanup failure is only logged. An
/// index failure is returned first; otherwise the batch result decides the
/// outcome.
pub async fn extract_all(
    config: Arc<ArchiveConfig>,
    registry: Arc<dyn Registry>,
    runtime: Arc<dyn ContainerRuntime>,
    options: ExtractAllOptions,
) -> Result<ExtractAllReport, PipelineError> {
    let batch = Extractor::new(config.clone(), registry.clone(), runtime.clone())
        .extract_all()
        .await;

    let cleanup = if options.cleanup {
        match ImageJanitor::new(config.clone(), runtime).cleanup_images().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Image cleanup failed: {}", e);
                None
            }
        }
    } else {
        None
    };

    let index = if options.skip_index {
        None
    } else {
        let summary = Reconciler::new(config, registry).generate_index().await?;
        info!(
            "Index: {} local, {} missing",
            summary.metadata.local_count,
            summary.missing_versions.len()
        );
        Some(summary)
    };

    Ok(ExtractAllReport {
        batch: batch?,
        cleanup,
        index,
    })
}
