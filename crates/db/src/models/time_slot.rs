//! Delivery time slot entity models and DTOs.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use greenmile_core::types::{DbId, Timestamp};

/// A row from the `delivery_time_slots` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimeSlot {
    pub id: DbId,
    pub delivery_person_id: DbId,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_orders: i32,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a time slot via `POST /api/v1/time-slots`.
#[derive(Debug, Deserialize)]
pub struct CreateTimeSlot {
    pub delivery_person_id: DbId,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_orders: i32,
    pub notes: Option<String>,
}

/// DTO for updating a time slot. All fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateTimeSlot {
    pub slot_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub max_orders: Option<i32>,
    pub notes: Option<String>,
}

/// Summary of an order booked into a slot (shown on schedule views).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SlotOrder {
    pub order_id: DbId,
    pub delivery_address: String,
    pub total_amount: f64,
}

/// A time slot together with the orders currently assigned to it.
#[derive(Debug, Serialize)]
pub struct TimeSlotWithOrders {
    #[serde(flatten)]
    pub slot: TimeSlot,
    pub orders: Vec<SlotOrder>,
}
