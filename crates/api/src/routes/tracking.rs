//! Route definitions for delivery tracking records.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::tracking;
use crate::state::AppState;

/// Tracking record routes — mounted at `/deliveries`.
///
/// `/delayed`, `/stats/statuses`, and `/order/{order_id}` are registered
/// as static segments, so they never collide with `/{id}`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tracking::list).post(tracking::create))
        .route("/delayed", get(tracking::delayed))
        .route("/stats/statuses", get(tracking::status_histogram))
        .route("/order/{order_id}", get(tracking::get_by_order))
        .route(
            "/{id}",
            get(tracking::get)
                .put(tracking::update)
                .delete(tracking::remove),
        )
        .route("/{id}/status", put(tracking::advance_status))
        .route("/{id}/location", put(tracking::relocate))
}
