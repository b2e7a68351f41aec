//! Report pipelines: metric derivation, snapshot fallback, filtering and
//! sorting, and the per-endpoint service that ties them together.

pub mod derive;
mod error;
pub mod fallback;
pub mod filter;
mod highlights;
pub mod params;
pub mod service;
pub mod simulate;
pub mod snapshot;

pub use error::ReportError;
pub use params::ReportParams;
pub use service::{ReportService, Sourced};
pub use snapshot::SnapshotStore;
