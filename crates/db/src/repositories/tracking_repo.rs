//! Repository for the `delivery_tracking` table.
//!
//! Every status mutation (assign, combined update, plain advance) goes
//! through `greenmile_core::dispatch::state_machine` inside a transaction
//! that holds a row lock on the affected record, so a read-modify-write
//! never interleaves with another writer on the same record.

use sqlx::{PgPool, Postgres, Transaction};

use greenmile_core::dispatch::state_machine;
use greenmile_core::error::CoreError;
use greenmile_core::types::DbId;

use crate::models::status::{DeliveryStatus, StatusId};
use crate::models::tracking::{
    AssignDelivery, CreateTracking, DeliveryTracking, TrackingDetail, UpdateTracking,
};
use crate::repositories::RepoError;

/// Column list for `delivery_tracking` queries.
const COLUMNS: &str = "\
    id, order_id, delivery_person_id, time_slot_id, status_id, \
    current_location, estimated_delivery_time, actual_delivery_time, \
    delivery_notes, created_at, updated_at";

/// Column list for detail queries joining `orders` and `users`
/// (aliased as `dt`/`o`/`u`). The derived DTO fields are `#[sqlx(skip)]`
/// and filled in by `TrackingDetail::with_derived`.
const DETAIL_COLUMNS: &str = "\
    dt.id, dt.order_id, dt.delivery_person_id, dt.time_slot_id, dt.status_id, \
    dt.current_location, dt.estimated_delivery_time, dt.actual_delivery_time, \
    dt.delivery_notes, dt.created_at, dt.updated_at, \
    u.username AS customer_name, u.email AS customer_email, \
    u.phone AS customer_phone, o.delivery_address, o.total_amount";

const DETAIL_JOINS: &str = "\
    FROM delivery_tracking dt \
    JOIN orders o ON o.id = dt.order_id \
    JOIN users u ON u.id = o.user_id";

/// Provides CRUD and dispatch operations for delivery tracking records.
pub struct TrackingRepo;

impl TrackingRepo {
    /// Create a tracking record for an order. Status starts at PENDING.
    ///
    /// The `uq_delivery_tracking_order` constraint rejects a second record
    /// for the same order (surfaces as a conflict at the API layer).
    pub async fn create(
        pool: &PgPool,
        input: &CreateTracking,
    ) -> Result<DeliveryTracking, sqlx::Error> {
        let query = format!(
            "INSERT INTO delivery_tracking \
                 (order_id, status_id, current_location, estimated_delivery_time, delivery_notes) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeliveryTracking>(&query)
            .bind(input.order_id)
            .bind(DeliveryStatus::Pending.id())
            .bind(&input.current_location)
            .bind(input.estimated_delivery_time)
            .bind(&input.delivery_notes)
            .fetch_one(pool)
            .await
    }

    /// Find a tracking record by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DeliveryTracking>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM delivery_tracking WHERE id = $1");
        sqlx::query_as::<_, DeliveryTracking>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the tracking record for an order (at most one by constraint).
    pub async fn find_by_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Option<DeliveryTracking>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM delivery_tracking WHERE order_id = $1");
        sqlx::query_as::<_, DeliveryTracking>(&query)
            .bind(order_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a record by ID joined with order and customer details.
    pub async fn detail_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TrackingDetail>, sqlx::Error> {
        let query = format!("SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} WHERE dt.id = $1");
        sqlx::query_as::<_, TrackingDetail>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the record for an order joined with order and customer details.
    pub async fn detail_by_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Option<TrackingDetail>, sqlx::Error> {
        let query = format!("SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} WHERE dt.order_id = $1");
        sqlx::query_as::<_, TrackingDetail>(&query)
            .bind(order_id)
            .fetch_optional(pool)
            .await
    }

    /// List records with optional status and delivery-person filters.
    pub async fn list(
        pool: &PgPool,
        status_id: Option<StatusId>,
        delivery_person_id: Option<DbId>,
    ) -> Result<Vec<DeliveryTracking>, sqlx::Error> {
        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if status_id.is_some() {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if delivery_person_id.is_some() {
            conditions.push(format!("delivery_person_id = ${bind_idx}"));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM delivery_tracking {where_clause} ORDER BY created_at ASC"
        );

        let mut q = sqlx::query_as::<_, DeliveryTracking>(&query);
        if let Some(sid) = status_id {
            q = q.bind(sid);
        }
        if let Some(pid) = delivery_person_id {
            q = q.bind(pid);
        }
        q.fetch_all(pool).await
    }

    /// Advance a record's status through the state machine.
    ///
    /// Transitions into DELIVERED stamp `actual_delivery_time` with the
    /// call time, overwriting any prior value: the last DELIVERED
    /// transition wins.
    pub async fn advance_status(
        pool: &PgPool,
        id: DbId,
        new_status: StatusId,
    ) -> Result<DeliveryTracking, RepoError> {
        let mut tx = pool.begin().await?;

        let current = Self::lock_by_id(&mut tx, id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "DeliveryTracking",
                id,
            })?;

        state_machine::validate_transition(current.status_id, new_status)
            .map_err(CoreError::InvalidState)?;

        let query = format!(
            "UPDATE delivery_tracking \
             SET status_id = $2, \
                 actual_delivery_time = CASE WHEN $3 THEN NOW() ELSE actual_delivery_time END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, DeliveryTracking>(&query)
            .bind(id)
            .bind(new_status)
            .bind(new_status == DeliveryStatus::Delivered.id())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Dispatcher assignment: set the delivery person, status, location,
    /// notes, and optionally book the record into a time slot.
    ///
    /// The slot's capacity is checked under a lock on the slot row inside
    /// the same transaction as the write, so two concurrent assignments
    /// cannot both squeeze into the last opening.
    pub async fn assign(
        pool: &PgPool,
        input: &AssignDelivery,
        new_status: StatusId,
    ) -> Result<DeliveryTracking, RepoError> {
        let mut tx = pool.begin().await?;

        let current = Self::lock_by_order(&mut tx, input.order_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "DeliveryTracking for order",
                id: input.order_id,
            })?;

        // Resolve the delivery person before touching the record.
        let person: Option<DbId> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
            .bind(input.delivery_person_id)
            .fetch_optional(&mut *tx)
            .await?;
        if person.is_none() {
            return Err(CoreError::NotFound {
                entity: "User",
                id: input.delivery_person_id,
            }
            .into());
        }

        state_machine::validate_transition(current.status_id, new_status)
            .map_err(CoreError::InvalidState)?;

        if let Some(slot_id) = input.time_slot_id {
            Self::check_slot_capacity(&mut tx, slot_id, current.id).await?;
        }

        let query = format!(
            "UPDATE delivery_tracking \
             SET delivery_person_id = $2, status_id = $3, current_location = $4, \
                 delivery_notes = $5, time_slot_id = COALESCE($6, time_slot_id), \
                 actual_delivery_time = CASE WHEN $7 THEN NOW() ELSE actual_delivery_time END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, DeliveryTracking>(&query)
            .bind(current.id)
            .bind(input.delivery_person_id)
            .bind(new_status)
            .bind(&input.current_location)
            .bind(&input.delivery_notes)
            .bind(input.time_slot_id)
            .bind(new_status == DeliveryStatus::Delivered.id())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Dispatcher combined field update (status, location, estimate, notes).
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTracking,
        new_status: StatusId,
    ) -> Result<DeliveryTracking, RepoError> {
        let mut tx = pool.begin().await?;

        let current = Self::lock_by_id(&mut tx, id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "DeliveryTracking",
                id,
            })?;

        state_machine::validate_transition(current.status_id, new_status)
            .map_err(CoreError::InvalidState)?;

        let query = format!(
            "UPDATE delivery_tracking \
             SET status_id = $2, \
                 current_location = COALESCE($3, current_location), \
                 estimated_delivery_time = COALESCE($4, estimated_delivery_time), \
                 delivery_notes = COALESCE($5, delivery_notes), \
                 actual_delivery_time = CASE WHEN $6 THEN NOW() ELSE actual_delivery_time END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, DeliveryTracking>(&query)
            .bind(id)
            .bind(new_status)
            .bind(&input.current_location)
            .bind(input.estimated_delivery_time)
            .bind(&input.delivery_notes)
            .bind(new_status == DeliveryStatus::Delivered.id())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Update the current location only. Status and delivery times are
    /// untouched; concurrent relocates are last-write-wins.
    pub async fn relocate(
        pool: &PgPool,
        id: DbId,
        location: &str,
    ) -> Result<Option<DeliveryTracking>, sqlx::Error> {
        let query = format!(
            "UPDATE delivery_tracking \
             SET current_location = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeliveryTracking>(&query)
            .bind(id)
            .bind(location)
            .fetch_optional(pool)
            .await
    }

    /// Delete a tracking record by ID.
    ///
    /// Returns `true` if a row was deleted, `false` if no record existed.
    /// Other failures propagate as errors instead of being folded into
    /// the boolean.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM delivery_tracking WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lock a record row for update within a transaction.
    async fn lock_by_id(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<DeliveryTracking>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM delivery_tracking WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, DeliveryTracking>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Lock the record for an order for update within a transaction.
    async fn lock_by_order(
        tx: &mut Transaction<'_, Postgres>,
        order_id: DbId,
    ) -> Result<Option<DeliveryTracking>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM delivery_tracking WHERE order_id = $1 FOR UPDATE");
        sqlx::query_as::<_, DeliveryTracking>(&query)
            .bind(order_id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Enforce `assigned_count < max_orders` for a slot, under a lock on
    /// the slot row. `record_id` is excluded from the count so re-assigning
    /// a record already in the slot is not double-counted.
    async fn check_slot_capacity(
        tx: &mut Transaction<'_, Postgres>,
        slot_id: DbId,
        record_id: DbId,
    ) -> Result<(), RepoError> {
        let max_orders: Option<i32> = sqlx::query_scalar(
            "SELECT max_orders FROM delivery_time_slots WHERE id = $1 FOR UPDATE",
        )
        .bind(slot_id)
        .fetch_optional(&mut **tx)
        .await?;

        let max_orders = max_orders.ok_or(CoreError::NotFound {
            entity: "TimeSlot",
            id: slot_id,
        })?;

        let assigned: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM delivery_tracking WHERE time_slot_id = $1 AND id <> $2",
        )
        .bind(slot_id)
        .bind(record_id)
        .fetch_one(&mut **tx)
        .await?;

        if assigned >= max_orders as i64 {
            return Err(CoreError::CapacityExceeded {
                slot_id,
                max_orders,
            }
            .into());
        }
        Ok(())
    }
}
