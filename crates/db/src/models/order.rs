//! Order lookup model (external collaborator).
//!
//! Order intake and payment live outside this service; the dispatch core
//! only reads the total, the address, and the owning customer's contact
//! details.

use serde::Serialize;
use sqlx::FromRow;

use greenmile_core::types::{DbId, Timestamp};

/// A row from the `orders` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: DbId,
    pub user_id: DbId,
    pub total_amount: f64,
    pub delivery_address: String,
    pub created_at: Timestamp,
}
