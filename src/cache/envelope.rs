//! Envelope Module
//!
//! Defines the immutable, timestamped snapshot of one resource's payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resource::ResourceId;

// == Envelope ==
/// Snapshot of a resource as produced by one successful fetch.
///
/// Envelopes are never mutated once built. The cache shares them behind an
/// `Arc` and a refresh always installs a new one, so readers see either the
/// old or the new snapshot in full. The serialized form is also the persisted
/// record layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Resource this payload belongs to
    #[serde(rename = "resourceID")]
    resource_id: ResourceId,
    /// When the payload was fetched
    fetched_at: DateTime<Utc>,
    /// Structured data produced by the fetcher
    payload: Value,
    /// Error of the latest failed refresh, if it failed after this fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fetch_error: Option<String>,
}

impl Envelope {
    // == Constructor ==
    /// Creates an envelope for a payload fetched just now.
    pub fn new(resource_id: ResourceId, payload: Value) -> Self {
        Self::fetched_at(resource_id, payload, Utc::now())
    }

    /// Creates an envelope with an explicit fetch time.
    pub fn fetched_at(resource_id: ResourceId, payload: Value, fetched_at: DateTime<Utc>) -> Self {
        Self {
            resource_id,
            fetched_at,
            payload,
            fetch_error: None,
        }
    }

    // == With Error ==
    /// Returns a new envelope with the same payload and fetch time, annotated
    /// with the error of a later failed refresh.
    pub fn with_error(&self, error: impl Into<String>) -> Self {
        Self {
            fetch_error: Some(error.into()),
            ..self.clone()
        }
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    pub fn fetched_at_time(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn fetch_error(&self) -> Option<&str> {
        self.fetch_error.as_deref()
    }

    /// Age of the payload at `now`, zero for timestamps in the future.
    pub fn age_at(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.fetched_at).to_std().unwrap_or_default()
    }
}
