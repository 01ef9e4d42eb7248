//! API Handlers
//!
//! HTTP request handlers mapping endpoints onto the coalescing fetcher.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::fetcher::CoalescingFetcher;
use crate::models::{ClearResponse, CreateUserRequest, HealthResponse, StatsResponse};
use crate::store::{MockUserStore, User};

/// Fetcher over the demo user store.
pub type UserFetcher = CoalescingFetcher<MockUserStore>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: UserFetcher,
}

impl AppState {
    pub fn new(fetcher: UserFetcher) -> Self {
        Self { fetcher }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Seeds the mock store and sizes the cache and queue from the Config.
    pub fn from_config(config: &Config) -> Self {
        let store = MockUserStore::seeded(Duration::from_millis(config.lookup_delay_ms));
        Self::new(CoalescingFetcher::from_config(Arc::new(store), config))
    }

    pub fn store(&self) -> &MockUserStore {
        self.fetcher.backend()
    }
}

/// Handler for GET /users/:id
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let user = state.fetcher.fetch(&id).await?;
    Ok(Json(user))
}

/// Handler for POST /users
///
/// Writes the user to the store, then caches it so the next read is a hit.
/// A read of the same id already in flight does not overwrite the new record.
pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let user = req.into_user();
    state.store().insert(user.clone()).await;
    state.fetcher.insert(user.id.clone(), user.clone()).await;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Handler for GET /cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.fetcher.cache().read().await.stats();

    Json(StatsResponse::new(
        cache,
        state.fetcher.queue().stats(),
        state.fetcher.in_flight_count(),
    ))
}

/// Handler for DELETE /cache
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared_at = state.fetcher.cache().write().await.clear();
    Json(ClearResponse::new(cleared_at))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
