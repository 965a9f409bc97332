use std::path::PathBuf;

use thiserror::Error;

use crate::version::error::RegistryError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{command} did not finish within {timeout_secs} seconds")]
    TimedOut { command: String, timeout_secs: u64 },

    #[error("{command} exited with status {status:?}: {output}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        output: String,
    },
}

/// Ways the probe output can violate the `GEMFILE_DIR=` / sentinel protocol
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("No Gemfile found in any candidate location")]
    ManifestNotFound,

    #[error("Output has no ===GEMFILE.EOF=== sentinel")]
    MissingSentinel,

    #[error("Gemfile section is empty")]
    EmptyManifest,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Not a release version: {0:?}")]
    InvalidVersion(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("Failed to pull {image} (exit status {status:?}):\n{output}")]
    PullFailed {
        image: String,
        status: Option<i32>,
        output: String,
    },

    #[error("Probe failed for {version} (exit status {status:?}):\n{output}")]
    ProbeFailed {
        version: String,
        status: Option<i32>,
        output: String,
    },

    #[error("Malformed probe output for {version}: {source}\n{output}")]
    Protocol {
        version: String,
        source: ProbeError,
        output: String,
    },

    #[error("Failed to write artifacts to {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{count} versions failed to extract: {}", .versions.join(", "))]
    Batch { count: usize, versions: Vec<String> },
}
