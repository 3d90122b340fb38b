//! Handlers for delivery tracking records.
//!
//! Covers record lifecycle (create, read, update, delete), status
//! advancement through the state machine, location updates, and the
//! read-side monitoring endpoints (delayed deliveries, status counts).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use serde::Deserialize;

use greenmile_core::dispatch;
use greenmile_core::error::CoreError;
use greenmile_core::types::DbId;
use greenmile_db::models::stats::StatusCount;
use greenmile_db::models::tracking::{CreateTracking, TrackingListQuery, UpdateTracking};
use greenmile_db::repositories::{OrderRepo, StatsRepo, TrackingRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body for `PUT /deliveries/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// New status name, e.g. `IN_TRANSIT`.
    pub status: String,
}

/// Body for `PUT /deliveries/{id}/location`.
#[derive(Debug, Deserialize)]
pub struct RelocateRequest {
    pub location: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve a status name to its ID, rejecting unknown names.
fn parse_status(name: &str) -> AppResult<i16> {
    dispatch::parse_status(name)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown delivery status: {name}")))
}

// ---------------------------------------------------------------------------
// POST /deliveries
// ---------------------------------------------------------------------------

/// Create a tracking record for an order. Status starts at PENDING.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateTracking>,
) -> AppResult<impl IntoResponse> {
    OrderRepo::find_by_id(&state.pool, body.order_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Order",
            id: body.order_id,
        }))?;

    let created = TrackingRepo::create(&state.pool, &body).await?;
    tracing::info!(id = created.id, order_id = created.order_id, "Tracking record created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

// ---------------------------------------------------------------------------
// GET /deliveries
// ---------------------------------------------------------------------------

/// List tracking records, optionally filtered by status name and/or
/// delivery person. Unknown status names are rejected rather than
/// silently matching nothing.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<TrackingListQuery>,
) -> AppResult<impl IntoResponse> {
    let status_id = params.status.as_deref().map(parse_status).transpose()?;

    let items = TrackingRepo::list(&state.pool, status_id, params.delivery_person_id).await?;
    tracing::debug!(count = items.len(), "Listed tracking records");
    Ok(Json(DataResponse { data: items }))
}

// ---------------------------------------------------------------------------
// GET /deliveries/{id}
// ---------------------------------------------------------------------------

/// Get a single record by ID, joined with order and customer details.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = TrackingRepo::detail_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "DeliveryTracking",
            id,
        }))?;
    Ok(Json(DataResponse {
        data: detail.with_derived(chrono::Utc::now()),
    }))
}

// ---------------------------------------------------------------------------
// GET /deliveries/order/{order_id}
// ---------------------------------------------------------------------------

/// Get the record for an order (customers track by order, not record ID).
pub async fn get_by_order(
    State(state): State<AppState>,
    Path(order_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = TrackingRepo::detail_by_order(&state.pool, order_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "DeliveryTracking for order",
            id: order_id,
        }))?;
    Ok(Json(DataResponse {
        data: detail.with_derived(chrono::Utc::now()),
    }))
}

// ---------------------------------------------------------------------------
// PUT /deliveries/{id}
// ---------------------------------------------------------------------------

/// Dispatcher combined update: status plus any of location, estimated
/// delivery time, and notes. The status change goes through the same
/// transition validation as a plain status advance.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateTracking>,
) -> AppResult<impl IntoResponse> {
    let new_status = parse_status(&body.status)?;

    let updated = TrackingRepo::update(&state.pool, id, &body, new_status).await?;
    tracing::info!(id, status = %body.status, "Tracking record updated");
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// PUT /deliveries/{id}/status
// ---------------------------------------------------------------------------

/// Advance a record's status through the state machine.
pub async fn advance_status(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateStatusRequest>,
) -> AppResult<impl IntoResponse> {
    let new_status = parse_status(&body.status)?;

    let updated = TrackingRepo::advance_status(&state.pool, id, new_status).await?;
    tracing::info!(id, status = %body.status, "Delivery status advanced");
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// PUT /deliveries/{id}/location
// ---------------------------------------------------------------------------

/// Update the current location only. Reported by the courier en route;
/// status and delivery times are untouched.
pub async fn relocate(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<RelocateRequest>,
) -> AppResult<impl IntoResponse> {
    let updated = TrackingRepo::relocate(&state.pool, id, &body.location)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "DeliveryTracking",
            id,
        }))?;
    tracing::debug!(id, location = %body.location, "Delivery location updated");
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// DELETE /deliveries/{id}
// ---------------------------------------------------------------------------

/// Delete a tracking record by ID.
pub async fn remove(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    let deleted = TrackingRepo::delete(&state.pool, id).await?;
    if deleted {
        tracing::info!(id, "Tracking record deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "DeliveryTracking",
            id,
        }))
    }
}

// ---------------------------------------------------------------------------
// GET /deliveries/delayed
// ---------------------------------------------------------------------------

/// List records past their estimated delivery time that are still active.
pub async fn delayed(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let items = StatsRepo::delayed(&state.pool).await?;
    tracing::debug!(count = items.len(), "Listed delayed deliveries");
    Ok(Json(DataResponse { data: items }))
}

// ---------------------------------------------------------------------------
// GET /deliveries/stats/statuses
// ---------------------------------------------------------------------------

/// System-wide record counts per status, plus a trailing TOTAL entry.
pub async fn status_histogram(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let mut buckets = StatsRepo::status_histogram(&state.pool).await?;
    let total: i64 = buckets.iter().map(|b| b.count).sum();
    buckets.push(StatusCount {
        status: "TOTAL".to_string(),
        count: total,
    });
    Ok(Json(DataResponse { data: buckets }))
}
