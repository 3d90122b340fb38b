//! Repository for the `delivery_time_slots` table.

use sqlx::PgPool;

use chrono::NaiveDate;
use greenmile_core::error::CoreError;
use greenmile_core::types::DbId;

use crate::models::status::DeliveryStatus;
use crate::models::time_slot::{
    CreateTimeSlot, SlotOrder, TimeSlot, TimeSlotWithOrders, UpdateTimeSlot,
};
use crate::repositories::RepoError;

/// Column list for `delivery_time_slots` queries.
const COLUMNS: &str = "\
    id, delivery_person_id, slot_date, start_time, end_time, \
    max_orders, notes, created_at, updated_at";

/// Provides CRUD operations for delivery time slots.
pub struct TimeSlotRepo;

impl TimeSlotRepo {
    /// Create a new time slot. The delivery person is resolved by the caller.
    pub async fn create(pool: &PgPool, input: &CreateTimeSlot) -> Result<TimeSlot, sqlx::Error> {
        let query = format!(
            "INSERT INTO delivery_time_slots \
                 (delivery_person_id, slot_date, start_time, end_time, max_orders, notes) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TimeSlot>(&query)
            .bind(input.delivery_person_id)
            .bind(input.slot_date)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.max_orders)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    /// Find a time slot by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TimeSlot>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM delivery_time_slots WHERE id = $1");
        sqlx::query_as::<_, TimeSlot>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a person's slots for a date, ordered by start time ascending.
    pub async fn list_schedule(
        pool: &PgPool,
        delivery_person_id: DbId,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM delivery_time_slots \
             WHERE delivery_person_id = $1 AND slot_date = $2 \
             ORDER BY start_time ASC"
        );
        sqlx::query_as::<_, TimeSlot>(&query)
            .bind(delivery_person_id)
            .bind(date)
            .fetch_all(pool)
            .await
    }

    /// Schedule listing with each slot's currently assigned orders.
    pub async fn list_schedule_with_orders(
        pool: &PgPool,
        delivery_person_id: DbId,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlotWithOrders>, sqlx::Error> {
        let slots = Self::list_schedule(pool, delivery_person_id, date).await?;
        let mut result = Vec::with_capacity(slots.len());
        for slot in slots {
            let orders = Self::orders_for_slot(pool, slot.id).await?;
            result.push(TimeSlotWithOrders { slot, orders });
        }
        Ok(result)
    }

    /// Order summaries for the records currently assigned to a slot.
    pub async fn orders_for_slot(
        pool: &PgPool,
        slot_id: DbId,
    ) -> Result<Vec<SlotOrder>, sqlx::Error> {
        sqlx::query_as::<_, SlotOrder>(
            "SELECT o.id AS order_id, o.delivery_address, o.total_amount \
             FROM delivery_tracking dt \
             JOIN orders o ON o.id = dt.order_id \
             WHERE dt.time_slot_id = $1 \
             ORDER BY o.id",
        )
        .bind(slot_id)
        .fetch_all(pool)
        .await
    }

    /// Number of records currently assigned to a slot.
    pub async fn assigned_count(pool: &PgPool, slot_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM delivery_tracking WHERE time_slot_id = $1")
            .bind(slot_id)
            .fetch_one(pool)
            .await
    }

    /// Update an existing time slot. Absent fields keep their values.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTimeSlot,
    ) -> Result<Option<TimeSlot>, sqlx::Error> {
        let query = format!(
            "UPDATE delivery_time_slots \
             SET slot_date = COALESCE($2, slot_date), \
                 start_time = COALESCE($3, start_time), \
                 end_time = COALESCE($4, end_time), \
                 max_orders = COALESCE($5, max_orders), \
                 notes = COALESCE($6, notes), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TimeSlot>(&query)
            .bind(id)
            .bind(input.slot_date)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.max_orders)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    /// Delete a time slot.
    ///
    /// Blocked while the slot still has non-terminal deliveries assigned;
    /// completed or failed deliveries are unlinked from the slot before
    /// deletion so history is kept on the tracking records themselves.
    /// Returns `false` when no slot with that ID exists.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, RepoError> {
        let mut tx = pool.begin().await?;

        let exists: Option<DbId> =
            sqlx::query_scalar("SELECT id FROM delivery_time_slots WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(false);
        }

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM delivery_tracking \
             WHERE time_slot_id = $1 AND status_id NOT IN ($2, $3)",
        )
        .bind(id)
        .bind(DeliveryStatus::Delivered.id())
        .bind(DeliveryStatus::Failed.id())
        .fetch_one(&mut *tx)
        .await?;

        if active > 0 {
            return Err(CoreError::Conflict(format!(
                "Time slot {id} still has {active} active deliveries assigned"
            ))
            .into());
        }

        sqlx::query("UPDATE delivery_tracking SET time_slot_id = NULL WHERE time_slot_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM delivery_time_slots WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
