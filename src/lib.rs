//! Archive of Gemfile / Gemfile.lock pairs extracted from versioned container images
//!
//! - [`version`]: version identities and the remote catalog
//! - [`archive`]: the local archive index and its reconciliation
//! - [`container`]: container runtime, probe protocol, extraction and cleanup
//! - [`pipeline`]: the full extract, clean up, index run
//! - [`config`]: shared configuration
//! - [`logging`]: tracing setup for the binary

pub mod archive;
pub mod config;
pub mod container;
pub mod logging;
pub mod pipeline;
pub mod version;
