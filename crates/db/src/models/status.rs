//! Status helper enum mapping to the SMALLSERIAL `delivery_statuses` table.
//!
//! The enum variant discriminants match the seed data order (1-based) in
//! the migration, and the API-facing names match what
//! `greenmile_core::dispatch::parse_status` accepts.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

/// Delivery lifecycle status.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending = 1,
    PickedUp = 2,
    InTransit = 3,
    Delivered = 4,
    Failed = 5,
}

impl DeliveryStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }
}

impl From<DeliveryStatus> for StatusId {
    fn from(value: DeliveryStatus) -> Self {
        value as StatusId
    }
}
