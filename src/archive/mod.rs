//! Local archive of extracted artifact pairs and its index
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│ Reconciler  │────▶│ LocalIndex  │
//! │ (remote)    │     │ (scan+diff) │     │ (index.yaml)│
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │ archive root│
//!                     │ v<version>/ │
//!                     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`index`]: YAML index of local versions, missing versions and summary metadata
//! - [`reconciler`]: Merges the scanned archive with the remote catalog
//! - [`error`]: Error types for index and reconciliation

pub mod error;
pub mod index;
pub mod reconciler;

pub use index::LocalIndex;
pub use reconciler::Reconciler;
