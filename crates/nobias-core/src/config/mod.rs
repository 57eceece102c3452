//! Engine configuration
//!
//! Configuration is an explicit, immutable, versioned value:
//!
//! - [`EngineConfig`] is the serde document (weights, inversion flags,
//!   variance scales, override rules, audit lexicons, verdict bands)
//! - [`ConfigSnapshot`] is a validated document plus its version and the
//!   derived, ready-to-evaluate state
//! - [`ConfigStore`] hands out `Arc<ConfigSnapshot>` and swaps whole
//!   snapshots atomically on reload
//!
//! Reviews only ever see a snapshot, never the store, so one review always
//! observes a single version from start to finish.

mod snapshot;
mod store;
mod types;

pub use snapshot::ConfigSnapshot;
pub use store::ConfigStore;
pub use types::{DimensionConfig, DimensionDependency, EngineConfig, WEIGHT_SUM_TOLERANCE};
