//! Delivery status state machine and delay math.
//!
//! This module lives in `core` (zero internal deps) so it can be used by
//! both the API layer and the repository layer: every status mutation,
//! whether it comes from the dispatcher's combined assign/update path or
//! from a plain status advance, is validated through the same transition
//! table here.

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Delivery status IDs matching `delivery_statuses` seed data (1-based
/// SMALLSERIAL).
pub mod state_machine {
    /// Returns the set of valid target status IDs reachable from `from_status`.
    ///
    /// Dispatchers may need to correct a mis-set status, so every
    /// non-terminal status can move to any other status, forwards or
    /// backwards, including straight into a terminal one. Terminal states
    /// (Delivered=4, Failed=5) return an empty slice because no further
    /// transitions are allowed.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // Pending -> PickedUp, InTransit, Delivered, Failed
            1 => &[2, 3, 4, 5],
            // PickedUp -> Pending, InTransit, Delivered, Failed
            2 => &[1, 3, 4, 5],
            // InTransit -> Pending, PickedUp, Delivered, Failed
            3 => &[1, 2, 4, 5],
            // Terminal states: Delivered, Failed
            4 | 5 => &[],
            // Unknown status: no transitions allowed
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    ///
    /// Re-setting the same non-terminal status is a legal no-op (the
    /// dispatcher's combined update path re-sends the current status).
    pub fn can_transition(from: i16, to: i16) -> bool {
        (from == to && !super::is_terminal(from) && !valid_transitions(from).is_empty())
            || valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            let from_name = super::status_name(from);
            let to_name = super::status_name(to);
            Err(format!(
                "Invalid transition: {from_name} ({from}) -> {to_name} ({to})"
            ))
        }
    }
}

/// Whether a status ID is terminal (no outgoing transitions).
pub fn is_terminal(status: i16) -> bool {
    matches!(status, 4 | 5)
}

/// Human-readable API name for a status ID.
pub fn status_name(id: i16) -> &'static str {
    match id {
        1 => "PENDING",
        2 => "PICKED_UP",
        3 => "IN_TRANSIT",
        4 => "DELIVERED",
        5 => "FAILED",
        _ => "UNKNOWN",
    }
}

/// Parse an API status string into a status ID. Unknown strings map to
/// `None`; the API boundary turns that into a validation error.
pub fn parse_status(name: &str) -> Option<i16> {
    match name {
        "PENDING" => Some(1),
        "PICKED_UP" => Some(2),
        "IN_TRANSIT" => Some(3),
        "DELIVERED" => Some(4),
        "FAILED" => Some(5),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Delay math
// ---------------------------------------------------------------------------

use crate::types::Timestamp;

/// Whole minutes from `now` until `estimated`. Negative means overdue.
pub fn minutes_until(now: Timestamp, estimated: Timestamp) -> i64 {
    (estimated - now).num_minutes()
}

/// A delivery is delayed once its estimated time has passed.
pub fn is_delayed(now: Timestamp, estimated: Timestamp) -> bool {
    minutes_until(now, estimated) < 0
}
