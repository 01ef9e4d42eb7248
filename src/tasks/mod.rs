//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Prune: sweeps expired cache entries at the configured interval

mod prune;

pub use prune::spawn_prune_task;
