//! API Module
//!
//! HTTP handlers and routing for the record service.
//!
//! # Endpoints
//! - `GET /users/:id` - Fetch a user through the cache
//! - `POST /users` - Create or replace a user
//! - `GET /cache/stats` - Cache, queue and in-flight statistics
//! - `DELETE /cache` - Clear the cache
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
