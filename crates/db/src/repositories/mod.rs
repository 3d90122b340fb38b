//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Plain CRUD methods return
//! `sqlx::Error`; the transactional dispatch methods return [`RepoError`]
//! because they can also fail domain validation (illegal transition,
//! capacity) inside the transaction.

use greenmile_core::error::CoreError;

pub mod order_repo;
pub mod stats_repo;
pub mod time_slot_repo;
pub mod tracking_repo;
pub mod user_repo;

pub use order_repo::OrderRepo;
pub use stats_repo::StatsRepo;
pub use time_slot_repo::TimeSlotRepo;
pub use tracking_repo::TrackingRepo;
pub use user_repo::UserRepo;

/// Error type for repository methods that mix database access with domain
/// validation inside a single transaction.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
