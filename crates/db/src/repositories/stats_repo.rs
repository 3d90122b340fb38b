//! Read-side aggregation over the `delivery_tracking` table.
//!
//! Everything here is recomputed from current record state on each call;
//! nothing is cached or maintained incrementally. The queries are indexed
//! counts rather than full scans, but the results are identical to a
//! full-scan computation.

use sqlx::PgPool;

use greenmile_core::stats;
use greenmile_core::types::DbId;

use crate::models::stats::{DeliveryStats, StatusCount};
use crate::models::status::DeliveryStatus;
use crate::models::tracking::TrackingDetail;

/// Provides derived statistics over delivery tracking records.
pub struct StatsRepo;

impl StatsRepo {
    /// Dashboard statistics for one delivery person.
    pub async fn person_stats(
        pool: &PgPool,
        delivery_person_id: DbId,
    ) -> Result<DeliveryStats, sqlx::Error> {
        let pending =
            Self::count_by_status(pool, delivery_person_id, DeliveryStatus::Pending).await?;
        let in_transit =
            Self::count_by_status(pool, delivery_person_id, DeliveryStatus::InTransit).await?;
        let total_deliveries =
            Self::count_by_status(pool, delivery_person_id, DeliveryStatus::Delivered).await?;

        // Completed today: delivered records whose actual delivery time
        // falls within [start-of-today, start-of-tomorrow).
        let completed_today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM delivery_tracking \
             WHERE delivery_person_id = $1 AND status_id = $2 \
               AND actual_delivery_time >= CURRENT_DATE \
               AND actual_delivery_time < CURRENT_DATE + INTERVAL '1 day'",
        )
        .bind(delivery_person_id)
        .bind(DeliveryStatus::Delivered.id())
        .fetch_one(pool)
        .await?;

        // Attempts are every record ever assigned to the person,
        // regardless of status.
        let total_attempts: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM delivery_tracking WHERE delivery_person_id = $1",
        )
        .bind(delivery_person_id)
        .fetch_one(pool)
        .await?;

        Ok(DeliveryStats {
            pending_deliveries: pending,
            in_transit,
            completed_today,
            total_deliveries,
            total_earnings: stats::earnings(total_deliveries),
            success_rate: stats::success_rate(total_deliveries, total_attempts),
        })
    }

    /// Records whose estimated delivery time has passed and which are not
    /// in a terminal status. Delivered and failed records never appear
    /// here, no matter how old their estimate is.
    pub async fn delayed(pool: &PgPool) -> Result<Vec<TrackingDetail>, sqlx::Error> {
        let now = chrono::Utc::now();
        let rows = sqlx::query_as::<_, TrackingDetail>(
            "SELECT dt.id, dt.order_id, dt.delivery_person_id, dt.time_slot_id, dt.status_id, \
                    dt.current_location, dt.estimated_delivery_time, dt.actual_delivery_time, \
                    dt.delivery_notes, dt.created_at, dt.updated_at, \
                    u.username AS customer_name, u.email AS customer_email, \
                    u.phone AS customer_phone, o.delivery_address, o.total_amount \
             FROM delivery_tracking dt \
             JOIN orders o ON o.id = dt.order_id \
             JOIN users u ON u.id = o.user_id \
             WHERE dt.estimated_delivery_time IS NOT NULL \
               AND dt.estimated_delivery_time < NOW() \
               AND dt.status_id NOT IN ($1, $2) \
             ORDER BY dt.estimated_delivery_time ASC",
        )
        .bind(DeliveryStatus::Delivered.id())
        .bind(DeliveryStatus::Failed.id())
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.with_derived(now)).collect())
    }

    /// System-wide count of records per status. Every status appears,
    /// with a zero count when no records hold it.
    pub async fn status_histogram(pool: &PgPool) -> Result<Vec<StatusCount>, sqlx::Error> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT ds.name, COUNT(dt.id) \
             FROM delivery_statuses ds \
             LEFT JOIN delivery_tracking dt ON dt.status_id = ds.id \
             GROUP BY ds.id, ds.name \
             ORDER BY ds.id",
        )
        .fetch_all(pool)
        .await
        .map(|rows| {
            rows.into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect()
        })
    }

    async fn count_by_status(
        pool: &PgPool,
        delivery_person_id: DbId,
        status: DeliveryStatus,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM delivery_tracking \
             WHERE delivery_person_id = $1 AND status_id = $2",
        )
        .bind(delivery_person_id)
        .bind(status.id())
        .fetch_one(pool)
        .await
    }
}
