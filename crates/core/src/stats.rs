//! Derived delivery statistics helpers.
//!
//! Earnings and success rate are never persisted; they are recomputed from
//! counts on every stats request.

/// Flat per-delivery payout in dollars.
pub const EARNINGS_PER_DELIVERY: f64 = 5.0;

/// Total earnings for a number of completed deliveries.
pub fn earnings(total_deliveries: i64) -> f64 {
    total_deliveries as f64 * EARNINGS_PER_DELIVERY
}

/// Success rate as a percentage of all records ever assigned to a person.
///
/// Returns exactly 0.0 when there are no attempts.
pub fn success_rate(total_deliveries: i64, total_attempts: i64) -> f64 {
    if total_attempts == 0 {
        0.0
    } else {
        total_deliveries as f64 / total_attempts as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_attempts_is_zero_not_nan() {
        let rate = success_rate(0, 0);
        assert_eq!(rate, 0.0);
        assert!(!rate.is_nan());
    }

    #[test]
    fn three_of_five_is_sixty_percent() {
        assert_eq!(success_rate(3, 5), 60.0);
    }

    #[test]
    fn all_delivered_is_one_hundred_percent() {
        assert_eq!(success_rate(4, 4), 100.0);
    }

    #[test]
    fn earnings_are_flat_rate() {
        assert_eq!(earnings(0), 0.0);
        assert_eq!(earnings(3), 15.0);
    }
}
