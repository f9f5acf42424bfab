//! Booking rules that are configuration rather than invariants.

use chrono::Duration;
use roomly_core::types::AmenityCategory;

/// Default rate-limit window for restricted categories.
pub const DEFAULT_RATE_LIMIT_DAYS: u32 = 15;

/// Rate limiting and date rules applied when booking.
///
/// # Example
///
/// ```
/// use roomly_engine::BookingPolicy;
/// use roomly_core::types::AmenityCategory;
///
/// let policy = BookingPolicy::default();
/// assert!(policy.is_restricted(AmenityCategory::Pool));
/// assert!(!policy.is_restricted(AmenityCategory::Gym));
/// assert_eq!(policy.rate_limit_days, 15);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingPolicy {
    /// A user may hold at most one active booking per restricted category
    /// created within this many days
    pub rate_limit_days: u32,
    /// Categories subject to the rate limit
    pub restricted_categories: Vec<AmenityCategory>,
    /// Accept bookings for days before today
    pub allow_past_dates: bool,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            rate_limit_days: DEFAULT_RATE_LIMIT_DAYS,
            restricted_categories: vec![AmenityCategory::Pool],
            allow_past_dates: false,
        }
    }
}

impl BookingPolicy {
    /// Returns `true` if bookings of `category` are rate limited.
    #[must_use]
    pub fn is_restricted(&self, category: AmenityCategory) -> bool {
        self.rate_limit_days > 0 && self.restricted_categories.contains(&category)
    }

    /// The rate-limit window.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::days(i64::from(self.rate_limit_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_window_disables_rate_limit() {
        let policy = BookingPolicy {
            rate_limit_days: 0,
            ..BookingPolicy::default()
        };
        assert!(!policy.is_restricted(AmenityCategory::Pool));
    }

    #[test]
    fn test_custom_categories() {
        let policy = BookingPolicy {
            restricted_categories: vec![AmenityCategory::Grill, AmenityCategory::EventHall],
            ..BookingPolicy::default()
        };
        assert!(policy.is_restricted(AmenityCategory::Grill));
        assert!(!policy.is_restricted(AmenityCategory::Pool));
        assert_eq!(policy.window(), Duration::days(15));
    }
}
