//! Fetcher Module
//!
//! Request coalescing between callers and the backend lookup.

mod backend;
mod coalescing;
mod registry;

pub use backend::Backend;
pub use coalescing::CoalescingFetcher;
pub use registry::{Flight, FlightGuard, InFlightRegistry};
