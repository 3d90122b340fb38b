//! Delivery tracking entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use greenmile_core::dispatch;
use greenmile_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `delivery_tracking` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeliveryTracking {
    pub id: DbId,
    pub order_id: DbId,
    pub delivery_person_id: Option<DbId>,
    pub time_slot_id: Option<DbId>,
    pub status_id: StatusId,
    pub current_location: Option<String>,
    pub estimated_delivery_time: Option<Timestamp>,
    pub actual_delivery_time: Option<Timestamp>,
    pub delivery_notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a tracking record via `POST /api/v1/deliveries`.
///
/// Status always starts at PENDING; it is not a caller input.
#[derive(Debug, Deserialize)]
pub struct CreateTracking {
    pub order_id: DbId,
    pub current_location: Option<String>,
    pub estimated_delivery_time: Option<Timestamp>,
    pub delivery_notes: Option<String>,
}

/// Dispatcher combined update via `PUT /api/v1/deliveries/{id}`.
///
/// The status goes through the same transition validation as a plain
/// status advance.
#[derive(Debug, Deserialize)]
pub struct UpdateTracking {
    pub status: String,
    pub current_location: Option<String>,
    pub estimated_delivery_time: Option<Timestamp>,
    pub delivery_notes: Option<String>,
}

/// Dispatcher assignment via `PUT /api/v1/dispatch/assign`.
///
/// Looks the record up by order, assigns the delivery person, and
/// optionally books the record into a time slot (capacity-checked).
#[derive(Debug, Deserialize)]
pub struct AssignDelivery {
    pub order_id: DbId,
    pub delivery_person_id: DbId,
    pub status: String,
    pub current_location: Option<String>,
    pub delivery_notes: Option<String>,
    pub time_slot_id: Option<DbId>,
}

/// Query parameters for `GET /api/v1/deliveries`.
#[derive(Debug, Deserialize)]
pub struct TrackingListQuery {
    /// Filter by API status name (e.g. `IN_TRANSIT`).
    pub status: Option<String>,
    pub delivery_person_id: Option<DbId>,
}

/// Tracking record joined with its order and customer details, plus the
/// derived delay fields. Returned by the single-record read endpoints.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TrackingDetail {
    pub id: DbId,
    pub order_id: DbId,
    pub delivery_person_id: Option<DbId>,
    pub time_slot_id: Option<DbId>,
    pub status_id: StatusId,
    pub current_location: Option<String>,
    pub estimated_delivery_time: Option<Timestamp>,
    pub actual_delivery_time: Option<Timestamp>,
    pub delivery_notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub delivery_address: String,
    pub total_amount: f64,
    #[sqlx(skip)]
    pub status: String,
    #[sqlx(skip)]
    pub minutes_until_delivery: Option<i64>,
    #[sqlx(skip)]
    pub is_delayed: Option<bool>,
}

impl TrackingDetail {
    /// Fill in the derived fields (status name, delay math) against `now`.
    pub fn with_derived(mut self, now: Timestamp) -> Self {
        self.status = dispatch::status_name(self.status_id).to_string();
        if let Some(estimated) = self.estimated_delivery_time {
            self.minutes_until_delivery = Some(dispatch::minutes_until(now, estimated));
            self.is_delayed = Some(dispatch::is_delayed(now, estimated));
        }
        self
    }
}
