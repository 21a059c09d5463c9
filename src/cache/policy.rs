//! Staleness Policy Module
//!
//! Decides, from "now" and the time of the last refresh, whether a resource
//! must be refreshed before it is served.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Staleness Policy ==
/// Per-resource freshness rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "max_age_secs", rename_all = "snake_case")]
pub enum StalenessPolicy {
    /// Every access needs a refresh
    AlwaysStale,
    /// Stale once more than the given duration has elapsed since the fetch
    #[serde(serialize_with = "serialize_secs")]
    MaxAge(Duration),
}

impl StalenessPolicy {
    /// Convenience constructor for `MaxAge` in whole seconds.
    pub fn max_age_secs(secs: u64) -> Self {
        StalenessPolicy::MaxAge(Duration::from_secs(secs))
    }

    // == Is Stale ==
    /// Returns true when data fetched at `fetched_at` must be refreshed at `now`.
    ///
    /// Boundary condition: `MaxAge(d)` is stale only when strictly more than
    /// `d` has elapsed. A timestamp in the future counts as zero age.
    pub fn is_stale(&self, now: DateTime<Utc>, fetched_at: DateTime<Utc>) -> bool {
        match self {
            StalenessPolicy::AlwaysStale => true,
            StalenessPolicy::MaxAge(max_age) => {
                let age = (now - fetched_at).to_std().unwrap_or(Duration::ZERO);
                age > *max_age
            }
        }
    }
}

impl fmt::Display for StalenessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StalenessPolicy::AlwaysStale => write!(f, "always-stale"),
            StalenessPolicy::MaxAge(max_age) => write!(f, "max-age {}s", max_age.as_secs()),
        }
    }
}

fn serialize_secs<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}
