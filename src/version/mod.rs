//! Version layer: identities and the remote catalog
//!
//! # Modules
//!
//! - [`identity`]: `N.N.N` version identity with numeric ordering and archive paths
//! - [`registry`]: Registry trait for fetching versions from remote sources
//! - [`registries`]: Concrete registry implementations (Docker Hub)
//! - [`error`]: Error types for registry operations

pub mod error;
pub mod identity;
pub mod registries;
pub mod registry;

pub use identity::VersionIdentity;
