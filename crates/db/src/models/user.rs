//! User lookup model (external collaborator).
//!
//! Authentication and registration live outside this service; the dispatch
//! core only resolves delivery people and customers by id.

use serde::Serialize;
use sqlx::FromRow;

use greenmile_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub created_at: Timestamp,
}
