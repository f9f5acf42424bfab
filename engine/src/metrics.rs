//! Business metrics for Roomly.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `roomly_reservations_created_total` - Reservations persisted
//! - `roomly_reservation_conflicts_total{reason}` - Bookings rejected by slot exclusivity or rate limit
//! - `roomly_points_awarded_total{action}` - Points written to the ledger
//! - `roomly_aggregate_step_failures_total{step}` - Cached-total updates that failed after the ledger write
//! - `roomly_points_award_failures_total{operation}` - Side-effect awards that were dropped

use metrics::describe_counter;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "roomly_reservations_created_total",
        "Total number of reservations created"
    );
    describe_counter!(
        "roomly_reservation_conflicts_total",
        "Bookings rejected because the slot was taken or the rate limit had not elapsed"
    );
    describe_counter!(
        "roomly_points_awarded_total",
        "Total points appended to the ledger, by action"
    );
    describe_counter!(
        "roomly_aggregate_step_failures_total",
        "Cached point-total updates that failed after the ledger entry was written"
    );
    describe_counter!(
        "roomly_points_award_failures_total",
        "Point awards dropped while the operation that earned them succeeded"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a reservation created event.
pub fn record_reservation_created() {
    metrics::counter!("roomly_reservations_created_total").increment(1);
}

/// Record a rejected booking.
///
/// # Arguments
///
/// * `reason` - `slot_taken` or `rate_limited`
pub fn record_reservation_conflict(reason: &'static str) {
    metrics::counter!("roomly_reservation_conflicts_total", "reason" => reason).increment(1);
    tracing::debug!(reason, "Recorded reservation_conflict metric");
}

/// Record points appended to the ledger.
pub fn record_points_awarded(action: &'static str, points: i64) {
    metrics::counter!("roomly_points_awarded_total", "action" => action)
        .increment(points.unsigned_abs());
}

/// Record a failed aggregate step (`user` or `community`).
pub fn record_aggregate_step_failure(step: &'static str) {
    metrics::counter!("roomly_aggregate_step_failures_total", "step" => step).increment(1);
}

/// Record a dropped side-effect award.
pub fn record_points_failure(operation: &'static str) {
    metrics::counter!("roomly_points_award_failures_total", "operation" => operation).increment(1);
}
