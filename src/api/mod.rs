//! API Module
//!
//! HTTP handlers and routing for the matchday REST API.
//!
//! # Endpoints
//! - `GET /results[/:day]` - Fixtures and scores
//! - `GET /games[/:day]` - Match details
//! - `GET /standings`, `GET /channels`, `GET /events` - Listings
//! - `GET /resources[/:id]`, `POST /resources/:id/refresh` - Resource access and triggers
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
