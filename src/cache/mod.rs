//! Cache Module
//!
//! Staleness-driven refresh cache: per-resource envelopes, freshness
//! policies, single-flight refreshes and counters.

mod envelope;
mod policy;
mod refresh;
mod stats;


// Re-export public types
pub use envelope::Envelope;
pub use policy::StalenessPolicy;
pub use refresh::{RefreshCache, RefreshOptions, ResourceStatus, ServeSource, Served};
pub use stats::{CacheStats, StatsRecorder};
