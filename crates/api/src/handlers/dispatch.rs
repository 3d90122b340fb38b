//! Handlers for the dispatcher: courier assignment, per-person dashboard
//! statistics, and delivery time slot management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use chrono::NaiveDate;
use serde::Deserialize;

use greenmile_core::dispatch;
use greenmile_core::error::CoreError;
use greenmile_core::types::DbId;
use greenmile_db::models::time_slot::{CreateTimeSlot, UpdateTimeSlot};
use greenmile_db::repositories::{StatsRepo, TimeSlotRepo, TrackingRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Query parameters for `GET /dispatch/schedule/{person_id}`.
#[derive(Debug, Deserialize)]
pub struct ScheduleParams {
    /// Schedule date; defaults to today when absent.
    pub date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Verify that a delivery person exists.
async fn ensure_person_exists(pool: &sqlx::PgPool, id: DbId) -> AppResult<()> {
    UserRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// PUT /dispatch/assign
// ---------------------------------------------------------------------------

/// Assign a delivery person to an order's tracking record, optionally
/// booking it into a time slot. The slot's capacity and the status
/// transition are both enforced atomically with the write.
pub async fn assign(
    State(state): State<AppState>,
    Json(body): Json<greenmile_db::models::tracking::AssignDelivery>,
) -> AppResult<impl IntoResponse> {
    let new_status = dispatch::parse_status(&body.status)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown delivery status: {}", body.status)))?;

    let updated = TrackingRepo::assign(&state.pool, &body, new_status).await?;
    tracing::info!(
        id = updated.id,
        order_id = body.order_id,
        delivery_person_id = body.delivery_person_id,
        status = %body.status,
        "Delivery assigned"
    );
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// GET /dispatch/stats/{person_id}
// ---------------------------------------------------------------------------

/// Dashboard statistics for one delivery person.
pub async fn person_stats(
    State(state): State<AppState>,
    Path(person_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_person_exists(&state.pool, person_id).await?;

    let stats = StatsRepo::person_stats(&state.pool, person_id).await?;
    Ok(Json(DataResponse { data: stats }))
}

// ---------------------------------------------------------------------------
// GET /dispatch/schedule/{person_id}
// ---------------------------------------------------------------------------

/// A delivery person's time slots for a date (today by default), each
/// with its currently assigned orders, ordered by start time.
pub async fn schedule(
    State(state): State<AppState>,
    Path(person_id): Path<DbId>,
    Query(params): Query<ScheduleParams>,
) -> AppResult<impl IntoResponse> {
    ensure_person_exists(&state.pool, person_id).await?;

    let date = params.date.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let slots = TimeSlotRepo::list_schedule_with_orders(&state.pool, person_id, date).await?;
    tracing::debug!(person_id, %date, count = slots.len(), "Listed schedule");
    Ok(Json(DataResponse { data: slots }))
}

// ---------------------------------------------------------------------------
// POST /time-slots
// ---------------------------------------------------------------------------

/// Create a delivery time slot for a delivery person.
pub async fn create_time_slot(
    State(state): State<AppState>,
    Json(body): Json<CreateTimeSlot>,
) -> AppResult<impl IntoResponse> {
    ensure_person_exists(&state.pool, body.delivery_person_id).await?;

    if body.max_orders <= 0 {
        return Err(CoreError::Validation("max_orders must be positive".to_string()).into());
    }
    if body.end_time <= body.start_time {
        return Err(CoreError::Validation("end_time must be after start_time".to_string()).into());
    }

    let created = TimeSlotRepo::create(&state.pool, &body).await?;
    tracing::info!(
        id = created.id,
        delivery_person_id = created.delivery_person_id,
        "Time slot created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

// ---------------------------------------------------------------------------
// GET /time-slots/{id}
// ---------------------------------------------------------------------------

/// Get a single time slot by ID.
pub async fn get_time_slot(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let slot = TimeSlotRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TimeSlot",
            id,
        }))?;
    Ok(Json(DataResponse { data: slot }))
}

// ---------------------------------------------------------------------------
// PUT /time-slots/{id}
// ---------------------------------------------------------------------------

/// Update a time slot. Absent fields keep their values.
pub async fn update_time_slot(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateTimeSlot>,
) -> AppResult<impl IntoResponse> {
    if let Some(max_orders) = body.max_orders {
        if max_orders <= 0 {
            return Err(CoreError::Validation("max_orders must be positive".to_string()).into());
        }
    }

    let updated = TimeSlotRepo::update(&state.pool, id, &body)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TimeSlot",
            id,
        }))?;
    tracing::info!(id = updated.id, "Time slot updated");
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// DELETE /time-slots/{id}
// ---------------------------------------------------------------------------

/// Delete a time slot. Conflicts (409) while active deliveries are still
/// assigned to it.
pub async fn delete_time_slot(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = TimeSlotRepo::delete(&state.pool, id).await?;
    if deleted {
        tracing::info!(id, "Time slot deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "TimeSlot",
            id,
        }))
    }
}
