use serde::Deserialize;
use std::path::{Path, PathBuf};

use thiserror::Error;

// =============================================================================
// Archive layout constants
// =============================================================================

/// Manifest file name inside each version directory
pub const MANIFEST_FILE_NAME: &str = "Gemfile";

/// Resolved-lock file name inside each version directory
pub const LOCK_FILE_NAME: &str = "Gemfile.lock";

/// Index file name used when `index_path` is not configured
pub const INDEX_FILE_NAME: &str = "index.yaml";

/// Prefix of every version directory under the archive root
pub const VERSION_DIR_PREFIX: &str = "v";

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_REPOSITORY: &str = "metanorma/metanorma";

pub const DEFAULT_REGISTRY_URL: &str = "https://hub.docker.com";

pub const DEFAULT_ARCHIVE_ROOT: &str = "gemfiles";

pub const DEFAULT_DOCKER_BINARY: &str = "docker";

/// Tags requested per registry page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Images removed per `docker rmi` invocation during cleanup
pub const DEFAULT_CLEANUP_BATCH_SIZE: usize = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },
}

/// Archiver configuration, shared by every component
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Image repository on the registry (e.g. "metanorma/metanorma")
    pub repository: String,
    /// Base URL of the registry API
    pub registry_url: String,
    /// Directory holding one `v<version>` directory per extracted version
    pub archive_root: PathBuf,
    /// Index file location, defaults to `<archive_root>/index.yaml`
    pub index_path: Option<PathBuf>,
    /// Container runtime executable
    pub docker_binary: String,
    pub page_size: u32,
    pub cleanup_batch_size: usize,
    /// Kill a pull or probe run after this many seconds
    pub run_timeout_secs: Option<u64>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            repository: DEFAULT_REPOSITORY.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            archive_root: PathBuf::from(DEFAULT_ARCHIVE_ROOT),
            index_path: None,
            docker_binary: DEFAULT_DOCKER_BINARY.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            cleanup_batch_size: DEFAULT_CLEANUP_BATCH_SIZE,
            run_timeout_secs: None,
        }
    }
}

impl ArchiveConfig {
    /// Loads a YAML config file. Missing fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml_ng::Error> {
        // An empty document deserializes to unit, not to a mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(content)
    }

    pub fn index_path(&self) -> PathBuf {
        self.index_path
            .clone()
            .unwrap_or_else(|| self.archive_root.join(INDEX_FILE_NAME))
    }

    /// Full image reference for a tag, e.g. `metanorma/metanorma:1.2.3`
    pub fn image_ref(&self, tag: &str) -> String {
        format!("{}:{}", self.repository, tag)
    }
}

/// Returns the path to the data directory for gemfile-archiver.
/// Uses $XDG_DATA_HOME/gemfile-archiver if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/gemfile-archiver,
/// or ./gemfile-archiver if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("gemfile-archiver.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("gemfile-archiver")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_yaml_with_partial_document_uses_defaults_for_missing_fields() {
        let result = ArchiveConfig::from_yaml("repository: example/app\n").unwrap();

        assert_eq!(result.repository, "example/app");
        assert_eq!(result.registry_url, DEFAULT_REGISTRY_URL);
        assert_eq!(result.archive_root, PathBuf::from(DEFAULT_ARCHIVE_ROOT));
        assert_eq!(result.cleanup_batch_size, DEFAULT_CLEANUP_BATCH_SIZE);
    }

    #[test]
    fn from_yaml_with_full_document_parses_all_fields() {
        let result = ArchiveConfig::from_yaml(
            r#"
repository: example/app
registry_url: http://localhost:8080
archive_root: /srv/archive
index_path: /srv/index.yaml
docker_binary: podman
page_size: 25
cleanup_batch_size: 2
run_timeout_secs: 600
"#,
        )
        .unwrap();

        assert_eq!(
            result,
            ArchiveConfig {
                repository: "example/app".to_string(),
                registry_url: "http://localhost:8080".to_string(),
                archive_root: PathBuf::from("/srv/archive"),
                index_path: Some(PathBuf::from("/srv/index.yaml")),
                docker_binary: "podman".to_string(),
                page_size: 25,
                cleanup_batch_size: 2,
                run_timeout_secs: Some(600),
            }
        );
    }

    #[test]
    fn from_yaml_with_empty_document_returns_defaults() {
        assert_eq!(ArchiveConfig::from_yaml("").unwrap(), ArchiveConfig::default());
    }

    #[test]
    fn index_path_defaults_to_archive_root() {
        let config = ArchiveConfig {
            archive_root: PathBuf::from("/srv/archive"),
            ..Default::default()
        };

        assert_eq!(config.index_path(), PathBuf::from("/srv/archive/index.yaml"));
    }

    #[test]
    fn image_ref_joins_repository_and_tag() {
        let config = ArchiveConfig::default();
        assert_eq!(config.image_ref("1.2.3"), "metanorma/metanorma:1.2.3");
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/gemfile-archiver"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(
            path,
            PathBuf::from("/home/user/.local/share/gemfile-archiver")
        );
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./gemfile-archiver"));
    }
}
