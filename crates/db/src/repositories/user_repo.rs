//! User lookups (external collaborator).

use sqlx::PgPool;

use greenmile_core::types::DbId;

use crate::models::user::User;

const COLUMNS: &str = "id, username, email, phone, role, created_at";

/// Read-only access to the `users` table.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
