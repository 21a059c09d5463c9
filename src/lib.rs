//! Matchday - football data served from a staleness-driven refresh cache
//!
//! Scrapes fixtures, match details, standings and streaming listings, keeps
//! the latest snapshot of each in memory and on disk, and refreshes them on
//! access or on a schedule according to per-resource freshness policies.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod resource;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::RefreshCache;
pub use config::Config;
pub use tasks::spawn_scheduler;
