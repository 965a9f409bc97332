use std::path::PathBuf;

use thiserror::Error;

use crate::version::error::RegistryError;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to read index {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse index {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },

    #[error("Failed to serialize index: {0}")]
    Serialize(#[from] serde_yaml_ng::Error),

    #[error("Failed to write index {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Failed to scan archive {path:?}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },
}
