//! Pacing API router — mounts all endpoints under /api/v1/pacing.

use crate::handlers::{self, PacingState};
use axum::middleware;
use axum::routing::{get, patch, put};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Build the pacing router with all endpoints.
pub fn pacing_router(state: PacingState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Reports
        .route("/api/v1/pacing/opportunities", get(handlers::list_opportunities))
        .route(
            "/api/v1/pacing/opportunities/:id/placements",
            get(handlers::list_placements),
        )
        .route("/api/v1/pacing/placements/:id/flights", get(handlers::list_flights))
        .route("/api/v1/pacing/flights/:id/campaigns", get(handlers::list_campaigns))
        // Mutations
        .route(
            "/api/v1/pacing/flights/:id/allocations",
            put(handlers::update_campaign_allocations),
        )
        .route(
            "/api/v1/pacing/flights/:id/pacing-allocation",
            patch(handlers::update_pacing_allocation),
        )
        .route(
            "/api/v1/pacing/opportunities/:id/buffers",
            patch(handlers::update_buffers),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
