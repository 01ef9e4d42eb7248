//! Store Module
//!
//! The demo system of record served through the fetcher.

mod mock;
mod user;

pub use mock::MockUserStore;
pub use user::User;
