//! Removal of stale local images, keeping the newest for layer caching

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ArchiveConfig;
use crate::container::error::RuntimeError;
use crate::container::runtime::ContainerRuntime;
use crate::version::identity::VersionIdentity;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Images passed to successful removal batches
    pub removed: Vec<String>,
    /// Newest image, never removed
    pub retained: Option<String>,
    pub failed_batches: usize,
}

pub struct ImageJanitor {
    config: Arc<ArchiveConfig>,
    runtime: Arc<dyn ContainerRuntime>,
}

impl ImageJanitor {
    pub fn new(config: Arc<ArchiveConfig>, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { config, runtime }
    }

    /// Removes every versioned image of the repository except the newest one
    pub async fn cleanup_images(&self) -> Result<CleanupReport, RuntimeError> {
        let repository = &self.config.repository;

        let mut tags: Vec<VersionIdentity> = self
            .runtime
            .list_images(repository)
            .await?
            .into_iter()
            .filter(|tag| tag.starts_with(|c: char| c.is_ascii_digit()))
            .map(VersionIdentity::new)
            .collect();
        tags.sort();
        tags.dedup();

        let Some(newest) = tags.pop() else {
            info!("No versioned {} images to clean up", repository);
            return Ok(CleanupReport::default());
        };
        let retained = Some(self.config.image_ref(newest.number()));

        if tags.is_empty() {
            info!("Only {} present, nothing to clean up", newest);
            return Ok(CleanupReport {
                retained,
                ..Default::default()
            });
        }

        let stale: Vec<String> = tags
            .iter()
            .map(|tag| self.config.image_ref(tag.number()))
            .collect();
        let batch_size = self.config.cleanup_batch_size.max(1);
        let batches = stale.len().div_ceil(batch_size);
        info!("Removing {} stale images in {} batches", stale.len(), batches);

        let mut report = CleanupReport {
            retained,
            ..Default::default()
        };

        for (position, batch) in stale.chunks(batch_size).enumerate() {
            info!(
                "Removing batch {}/{}: {}",
                position + 1,
                batches,
                batch.join(" ")
            );

            match self.runtime.remove_images(batch).await {
                Ok(output) if output.is_success() => report.removed.extend_from_slice(batch),
                Ok(output) => {
                    warn!(
                        "Batch {}/{} failed: {}",
                        position + 1,
                        batches,
                        output.combined().trim()
                    );
                    report.failed_batches += 1;
                }
                Err(e) => {
                    warn!("Batch {}/{} failed: {}", position + 1, batches, e);
                    report.failed_batches += 1;
                }
            }
        }

        info!(
            "Kept {} for caching",
            report.retained.as_deref().unwrap_or_default()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::runtime::{CommandOutput, MockContainerRuntime};
    use mockall::Sequence;

    fn janitor(runtime: MockContainerRuntime) -> ImageJanitor {
        ImageJanitor::new(Arc::new(ArchiveConfig::default()), Arc::new(runtime))
    }

    fn images(tags: &[&str]) -> Vec<String> {
        tags.iter()
            .map(|tag| format!("metanorma/metanorma:{tag}"))
            .collect()
    }

    fn listing(tags: &[&str]) -> MockContainerRuntime {
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_list_images()
            .withf(|repository| repository == "metanorma/metanorma")
            .times(1)
            .returning(move |_| Ok(tags.clone()));
        runtime
    }

    #[tokio::test]
    async fn cleanup_removes_all_but_newest_in_one_batch() {
        let mut runtime = listing(&["1.2.0", "1.0.0", "1.1.0"]);
        let expected = images(&["1.0.0", "1.1.0"]);
        runtime
            .expect_remove_images()
            .withf(move |batch| batch == expected.as_slice())
            .times(1)
            .returning(|_| Ok(CommandOutput::success("")));

        let report = janitor(runtime).cleanup_images().await.unwrap();

        assert_eq!(
            report,
            CleanupReport {
                removed: images(&["1.0.0", "1.1.0"]),
                retained: Some("metanorma/metanorma:1.2.0".to_string()),
                failed_batches: 0,
            }
        );
    }

    #[tokio::test]
    async fn cleanup_with_single_image_removes_nothing() {
        let mut runtime = listing(&["1.2.0", "latest"]);
        runtime.expect_remove_images().never();

        let report = janitor(runtime).cleanup_images().await.unwrap();

        assert!(report.removed.is_empty());
        assert_eq!(
            report.retained.as_deref(),
            Some("metanorma/metanorma:1.2.0")
        );
    }

    #[tokio::test]
    async fn cleanup_without_versioned_images_is_noop() {
        let mut runtime = listing(&["latest", "main"]);
        runtime.expect_remove_images().never();

        let report = janitor(runtime).cleanup_images().await.unwrap();

        assert_eq!(report, CleanupReport::default());
    }

    #[tokio::test]
    async fn cleanup_batches_by_five_in_version_order() {
        let tags = [
            "1.10.0", "1.0.0", "1.1.0", "1.2.0", "1.3.0", "1.4.0", "1.5.0", "1.6.0", "1.7.0",
            "1.8.0", "1.9.0", "1.11.0", "2.0.0",
        ];
        let mut runtime = listing(&tags);
        let mut seq = Sequence::new();

        for expected in [
            images(&["1.0.0", "1.1.0", "1.2.0", "1.3.0", "1.4.0"]),
            images(&["1.5.0", "1.6.0", "1.7.0", "1.8.0", "1.9.0"]),
            images(&["1.10.0", "1.11.0"]),
        ] {
            runtime
                .expect_remove_images()
                .withf(move |batch| batch == expected.as_slice())
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(CommandOutput::success("")));
        }

        let report = janitor(runtime).cleanup_images().await.unwrap();

        assert_eq!(report.removed.len(), 12);
        assert_eq!(report.retained.as_deref(), Some("metanorma/metanorma:2.0.0"));
    }

    #[tokio::test]
    async fn cleanup_counts_failed_batches_and_continues() {
        let tags = ["1.0.0", "1.1.0", "1.2.0", "1.3.0", "1.4.0", "1.5.0", "1.6.0"];
        let mut runtime = listing(&tags);
        let mut seq = Sequence::new();
        let first = images(&["1.0.0", "1.1.0", "1.2.0", "1.3.0", "1.4.0"]);
        let second = images(&["1.5.0"]);
        runtime
            .expect_remove_images()
            .withf(move |batch| batch == first.as_slice())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(CommandOutput::failure(1, "image is in use")));
        runtime
            .expect_remove_images()
            .withf(move |batch| batch == second.as_slice())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(CommandOutput::success("")));

        let report = janitor(runtime).cleanup_images().await.unwrap();

        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.removed, images(&["1.5.0"]));
        assert_eq!(report.retained.as_deref(), Some("metanorma/metanorma:1.6.0"));
    }

    #[tokio::test]
    async fn cleanup_propagates_listing_failure() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_list_images().returning(|_| {
            Err(RuntimeError::CommandFailed {
                command: "docker images".to_string(),
                status: Some(1),
                output: "daemon not running".to_string(),
            })
        });

        let result = janitor(runtime).cleanup_images().await;

        assert!(matches!(result, Err(RuntimeError::CommandFailed { .. })));
    }
}
