//! Route definitions for the dispatcher and time slot management.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::dispatch;
use crate::state::AppState;

/// Dispatcher routes — mounted at `/dispatch`.
pub fn dispatch_router() -> Router<AppState> {
    Router::new()
        .route("/assign", put(dispatch::assign))
        .route("/stats/{person_id}", get(dispatch::person_stats))
        .route("/schedule/{person_id}", get(dispatch::schedule))
}

/// Time slot routes — mounted at `/time-slots`.
pub fn time_slot_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(dispatch::create_time_slot))
        .route(
            "/{id}",
            get(dispatch::get_time_slot)
                .put(dispatch::update_time_slot)
                .delete(dispatch::delete_time_slot),
        )
}
