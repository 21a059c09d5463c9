//! Response DTOs for the matchday API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, ResourceStatus, ServeSource, Served};
use crate::resource::ResourceId;

/// Response body for every data endpoint (fixtures, details, standings, ...)
#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeResponse {
    /// Resource the data belongs to
    pub resource: ResourceId,
    /// When the data was fetched upstream
    pub fetched_at: DateTime<Utc>,
    /// How the lookup was answered
    pub source: ServeSource,
    /// True when the latest refresh failed and older data is served
    pub stale: bool,
    /// Error of the failed refresh, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Payload produced by the fetcher
    pub data: Value,
}

impl From<Served> for EnvelopeResponse {
    fn from(served: Served) -> Self {
        let stale = served.is_stale();
        let envelope = served.envelope;
        Self {
            resource: envelope.resource_id().clone(),
            fetched_at: envelope.fetched_at_time(),
            source: served.source,
            stale,
            error: served.error.map(|err| err.to_string()),
            data: envelope.payload().clone(),
        }
    }
}

/// Response body for the resource listing (GET /resources)
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub resources: Vec<ResourceStatus>,
}

/// Response body for a background refresh trigger (POST /resources/:id/refresh)
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    /// Resource that was invalidated
    pub resource: String,
    /// Whether a background refresh was started by this request
    pub started: bool,
    pub message: String,
}

impl RefreshResponse {
    pub fn new(resource: impl Into<String>, started: bool) -> Self {
        let resource = resource.into();
        let message = if started {
            format!("Refresh of '{}' started", resource)
        } else {
            format!("Refresh of '{}' already in progress", resource)
        };
        Self {
            resource,
            started,
            message,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Number of registered resources
    pub resources: usize,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(resources: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            resources,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
