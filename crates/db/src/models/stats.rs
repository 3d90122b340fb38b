//! Derived delivery statistics DTOs (computed, not DB rows).

use serde::Serialize;

/// Per-person dashboard statistics, recomputed on every request.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryStats {
    pub pending_deliveries: i64,
    pub in_transit: i64,
    pub completed_today: i64,
    pub total_deliveries: i64,
    pub total_earnings: f64,
    pub success_rate: f64,
}

/// One bucket of the system-wide status histogram.
#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}
