//! Shared test doubles for integration tests

#![allow(dead_code)]

pub mod registry;
pub mod runtime;

pub use registry::MockRegistry;
pub use runtime::FakeRuntime;

use std::path::Path;
use std::sync::Arc;

use gemfile_archiver::config::ArchiveConfig;
use gemfile_archiver::version::VersionIdentity;

/// Config pointing every path into `root`
pub fn test_config(root: &Path) -> Arc<ArchiveConfig> {
    Arc::new(ArchiveConfig {
        repository: "metanorma/metanorma".to_string(),
        archive_root: root.join("gemfiles"),
        ..Default::default()
    })
}

/// Writes a complete artifact pair for `number`
pub fn write_pair(archive_root: &Path, number: &str) {
    let version = VersionIdentity::new(number);
    std::fs::create_dir_all(version.directory(archive_root)).unwrap();
    std::fs::write(
        version.manifest_path(archive_root),
        format!("source \"https://rubygems.org\"\ngem \"metanorma-cli\", \"= {number}\"\n"),
    )
    .unwrap();
    std::fs::write(version.lock_path(archive_root), "GEM\n  specs:\n").unwrap();
}
