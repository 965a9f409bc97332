//! Container side of the archiver
//!
//! # Modules
//!
//! - [`runtime`]: `ContainerRuntime` trait (pull, run, remove, list)
//! - [`docker`]: `docker` CLI implementation of the runtime
//! - [`probe`]: Probe script and the parser for its output
//! - [`extractor`]: Per-version and batch extraction into the archive
//! - [`janitor`]: Batched removal of stale local images
//! - [`error`]: Error types for runtime, probe and extraction failures

pub mod docker;
pub mod error;
pub mod extractor;
pub mod janitor;
pub mod probe;
pub mod runtime;

pub use docker::DockerCli;
pub use extractor::{BatchReport, ExtractOutcome, Extractor};
pub use janitor::{CleanupReport, ImageJanitor};
pub use runtime::{CommandOutput, ContainerRuntime};
