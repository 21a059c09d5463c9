//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Refresh scheduler: proactively refreshes stale resources on two cadences

mod scheduler;

pub use scheduler::{run_group, spawn_scheduler, TickReport};
