pub mod dispatch;
pub mod health;
pub mod tracking;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /deliveries                          list, create
/// /deliveries/delayed                  overdue active deliveries
/// /deliveries/stats/statuses           record counts per status
/// /deliveries/order/{order_id}         customer-facing lookup by order
/// /deliveries/{id}                     get, update, delete
/// /deliveries/{id}/status              advance status (PUT)
/// /deliveries/{id}/location            update location (PUT)
///
/// /dispatch/assign                     assign courier to order (PUT)
/// /dispatch/stats/{person_id}          per-person dashboard stats
/// /dispatch/schedule/{person_id}       day schedule with assigned orders
///
/// /time-slots                          create
/// /time-slots/{id}                     get, update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/deliveries", tracking::router())
        .nest("/dispatch", dispatch::dispatch_router())
        .nest("/time-slots", dispatch::time_slot_router())
}
