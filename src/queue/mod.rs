//! Queue Module
//!
//! Bounded-concurrency FIFO task queue used to cap simultaneous backend lookups.

mod handle;
mod task_queue;

pub use handle::TaskHandle;
pub use task_queue::{QueueStats, TaskQueue};
