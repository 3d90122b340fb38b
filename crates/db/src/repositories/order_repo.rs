//! Order lookups (external collaborator).

use sqlx::PgPool;

use greenmile_core::types::DbId;

use crate::models::order::Order;

const COLUMNS: &str = "id, user_id, total_amount, delivery_address, created_at";

/// Read-only access to the `orders` table.
pub struct OrderRepo;

impl OrderRepo {
    /// Find an order by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
