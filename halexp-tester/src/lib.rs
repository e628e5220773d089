//! halexp-tester library
//!
//! Configuration fan-out harness for the halexp ranked-search API: expands
//! parameter axes into configurations, queries every configuration
//! concurrently and exposes the normalized results side by side.

pub mod api;
pub mod axes;
pub mod busy;
pub mod details;
pub mod dispatcher;
pub mod error;
pub mod normalize;
pub mod plan;
pub mod render;
pub mod request;
pub mod table;
pub mod transport;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use halexp_common::config::HarnessConfig;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::dispatcher::QueryDispatcher;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Fan-out dispatcher owning the current run and detail store
    pub dispatcher: QueryDispatcher,
    /// Effective harness configuration (defaults for run requests)
    pub config: Arc<HarnessConfig>,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(dispatcher: QueryDispatcher, config: HarnessConfig) -> Self {
        Self {
            dispatcher,
            config: Arc::new(config),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/runs", post(api::start_run))
        .route("/api/runs/current", get(api::current_run))
        .route("/api/layout", post(api::preview_layout))
        .route("/api/details/:key", get(api::get_detail))
        .route("/api/events", get(api::event_stream))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .with_state(state)
        // Result pages may be served from another origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
