//! Request and Response models for the matchday API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::RefreshQuery;
pub use responses::{
    EnvelopeResponse, ErrorResponse, HealthResponse, RefreshResponse, StatsResponse,
    StatusResponse,
};
