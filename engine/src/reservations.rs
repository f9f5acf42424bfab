//! Reservation Manager: booking constraints and state transitions.
//!
//! # Booking
//!
//! `create` validates the request, checks the rate limit for restricted
//! categories, and inserts the reservation. Slot exclusivity is decided by
//! the store's uniqueness constraint; the read-side check before the insert
//! only produces a friendlier error in the common, uncontended case.
//!
//! Once the reservation is stored the amenity's reward is awarded through the
//! [`PointsCoordinator`]. A failed award is reported in the result and logged;
//! the reservation stands.
//!
//! # Lifecycle
//!
//! ```text
//! ACTIVE/PENDING ──cancel (owner)──▶ CANCELLED
//!        │
//!        └──grade (admin)──▶ FINALIZED/{FULFILLED|UNFULFILLED}
//! ```
//!
//! Both transitions are conditional writes in the store, so two concurrent
//! cancels (or grades) cannot both succeed.

use crate::access::{admin_scope, ensure_amenity_admin, load_user, require_admin};
use crate::metrics;
use crate::points::{PointsCoordinator, Rewarded};
use crate::policy::BookingPolicy;
use chrono::NaiveDate;
use roomly_core::environment::Clock;
use roomly_core::error::{Result, RoomlyError, SLOT_CONSTRAINT};
use roomly_core::points::AwardReason;
use roomly_core::repository::DataStore;
use roomly_core::slot::TimeSlot;
use roomly_core::types::{
    Amenity, AmenityId, AuditEntry, CommunityId, GradeOutcome, Reservation, ReservationId,
    ReservationStatus, User, UserId,
};
use serde::Serialize;
use std::sync::Arc;

/// A successful booking and the points it earned.
pub type Booking = Rewarded<Reservation>;

/// Whether a slot can still be booked on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    /// The slot
    pub time_slot: TimeSlot,
    /// `true` if no active or finalized reservation holds it
    pub available: bool,
}

/// Creates, cancels and grades reservations.
pub struct ReservationManager<S> {
    store: S,
    points: Arc<PointsCoordinator<S>>,
    clock: Arc<dyn Clock>,
    policy: BookingPolicy,
}

impl<S: DataStore> ReservationManager<S> {
    /// Create a new manager
    pub fn new(
        store: S,
        points: Arc<PointsCoordinator<S>>,
        clock: Arc<dyn Clock>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            store,
            points,
            clock,
            policy,
        }
    }

    /// The active booking policy.
    #[must_use]
    pub const fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    /// Book `slot` of `amenity_id` on `date` for `user_id`.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty or unknown slot, past date, inactive user
    /// - `NotFound`: unknown user or amenity
    /// - `Conflict`: slot taken, or rate limit not elapsed
    /// - `Store`: store failure
    pub async fn create(
        &self,
        user_id: UserId,
        amenity_id: AmenityId,
        date: NaiveDate,
        slot: &str,
    ) -> Result<Booking> {
        if slot.trim().is_empty() {
            return Err(RoomlyError::Validation("No time slot selected".into()));
        }
        let time_slot: TimeSlot = slot
            .parse()
            .map_err(|e: roomly_core::slot::InvalidTimeSlot| RoomlyError::Validation(e.to_string()))?;

        let today = self.clock.today();
        if date < today && !self.policy.allow_past_dates {
            return Err(RoomlyError::Validation(format!(
                "Cannot book {date}: the date is in the past"
            )));
        }

        let user = load_user(&self.store, user_id).await?;
        if !user.is_active() {
            return Err(RoomlyError::Validation(
                "Inactive accounts cannot make reservations".into(),
            ));
        }
        let amenity = self
            .store
            .get_amenity(amenity_id)
            .await?
            .ok_or_else(|| RoomlyError::not_found("amenity", amenity_id))?;

        let booked = self.store.list_amenity_reservations(amenity_id, date).await?;
        if booked
            .iter()
            .any(|r| r.time_slot == time_slot && r.status.holds_slot())
        {
            metrics::record_reservation_conflict("slot_taken");
            return Err(slot_taken(&amenity, date, time_slot));
        }

        self.check_rate_limit(&user, &amenity).await?;

        let reservation = Reservation::new(user.id, amenity.id, date, time_slot, self.clock.now());
        let reservation = match self.store.insert_reservation(&reservation).await {
            Ok(reservation) => reservation,
            Err(e) if e.violates(SLOT_CONSTRAINT) => {
                metrics::record_reservation_conflict("slot_taken");
                tracing::info!(
                    %amenity_id,
                    %date,
                    %time_slot,
                    "Lost booking race to a concurrent reservation"
                );
                return Err(slot_taken(&amenity, date, time_slot));
            }
            Err(e) => return Err(e.into()),
        };

        metrics::record_reservation_created();
        tracing::info!(
            reservation_id = %reservation.id,
            %user_id,
            %amenity_id,
            %date,
            %time_slot,
            "Reservation created"
        );

        let points = self
            .points
            .award_best_effort(&user, AwardReason::Reservation(&amenity), "reservation")
            .await;

        Ok(Rewarded {
            record: reservation,
            points,
        })
    }

    async fn check_rate_limit(&self, user: &User, amenity: &Amenity) -> Result<()> {
        if !self.policy.is_restricted(amenity.category) {
            return Ok(());
        }

        let Some(latest) = self
            .store
            .latest_active_in_category(user.id, amenity.category)
            .await?
        else {
            return Ok(());
        };

        let next_allowed = latest.created_at + self.policy.window();
        if self.clock.now() < next_allowed {
            metrics::record_reservation_conflict("rate_limited");
            tracing::info!(
                user_id = %user.id,
                category = %amenity.category,
                previous = %latest.id,
                "Booking rejected by category rate limit"
            );
            return Err(RoomlyError::Conflict(format!(
                "{} bookings are limited to one every {} days; you can book again from {}",
                amenity.category,
                self.policy.rate_limit_days,
                next_allowed.date_naive()
            )));
        }
        Ok(())
    }

    /// Cancel an active reservation. Only its owner may cancel it.
    ///
    /// Points earned by the booking are kept.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` if `actor` is not the owner, `State` if the
    /// reservation is not active, `Store` on store failure.
    pub async fn cancel(&self, actor: UserId, reservation_id: ReservationId) -> Result<Reservation> {
        let reservation = self.load(reservation_id).await?;
        if reservation.user_id != actor {
            return Err(RoomlyError::Forbidden(
                "Only the owner can cancel a reservation".into(),
            ));
        }

        let cancelled = self
            .store
            .cancel_reservation(reservation_id)
            .await?
            .ok_or_else(|| {
                RoomlyError::State(format!(
                    "Only active reservations can be cancelled (reservation is {})",
                    reservation.status
                ))
            })?;

        tracing::info!(%reservation_id, %actor, "Reservation cancelled");
        Ok(cancelled)
    }

    /// Record the compliance outcome of an active, pending reservation.
    ///
    /// Grading does not award or deduct points.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the actor administers the amenity's community,
    /// `NotFound`, `State` if the reservation is cancelled or already graded,
    /// `Store` on store failure.
    pub async fn grade(
        &self,
        actor: UserId,
        reservation_id: ReservationId,
        outcome: GradeOutcome,
    ) -> Result<Reservation> {
        let admin = require_admin(&self.store, actor, "grade reservations").await?;
        let reservation = self.load(reservation_id).await?;
        let amenity = self
            .store
            .get_amenity(reservation.amenity_id)
            .await?
            .ok_or_else(|| RoomlyError::not_found("amenity", reservation.amenity_id))?;
        ensure_amenity_admin(&admin, &amenity, "grade reservations")?;

        let graded = self
            .store
            .grade_reservation(reservation_id, outcome)
            .await?
            .ok_or_else(|| {
                RoomlyError::State(match reservation.status {
                    ReservationStatus::Cancelled => {
                        "Cancelled reservations cannot be graded".to_string()
                    }
                    _ => format!("Reservation is already graded ({})", reservation.grade),
                })
            })?;

        tracing::info!(%reservation_id, %actor, grade = %graded.grade, "Reservation graded");
        Ok(graded)
    }

    /// A user's reservations, latest date first.
    ///
    /// # Errors
    ///
    /// Returns `Store` on store failure.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Reservation>> {
        Ok(self.store.list_user_reservations(user_id).await?)
    }

    /// Non-cancelled reservations of an amenity on `date`, ordered by slot.
    ///
    /// # Errors
    ///
    /// Returns `Store` on store failure.
    pub async fn list_for_amenity_on(
        &self,
        amenity_id: AmenityId,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>> {
        Ok(self.store.list_amenity_reservations(amenity_id, date).await?)
    }

    /// Every slot of the day with its availability.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown amenity, `Store` on store failure.
    pub async fn available_slots(
        &self,
        amenity_id: AmenityId,
        date: NaiveDate,
    ) -> Result<Vec<SlotAvailability>> {
        if self.store.get_amenity(amenity_id).await?.is_none() {
            return Err(RoomlyError::not_found("amenity", amenity_id));
        }
        let booked = self.store.list_amenity_reservations(amenity_id, date).await?;

        Ok(TimeSlot::ALL
            .iter()
            .map(|&time_slot| SlotAvailability {
                time_slot,
                available: !booked
                    .iter()
                    .any(|r| r.time_slot == time_slot && r.status.holds_slot()),
            })
            .collect())
    }

    /// Reservations joined with amenity and resident, for compliance audits.
    ///
    /// Covers the admin's own community; `community_id`, when given, must be
    /// that community.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins or another community, `Store` on store
    /// failure.
    pub async fn audit(
        &self,
        actor: UserId,
        community_id: Option<CommunityId>,
    ) -> Result<Vec<AuditEntry>> {
        let admin = require_admin(&self.store, actor, "audit reservations").await?;
        let scope = admin_scope(&admin, community_id, "audit reservations")?;
        Ok(self.store.audit_reservations(Some(scope)).await?)
    }

    async fn load(&self, reservation_id: ReservationId) -> Result<Reservation> {
        self.store
            .get_reservation(reservation_id)
            .await?
            .ok_or_else(|| RoomlyError::not_found("reservation", reservation_id))
    }
}

fn slot_taken(amenity: &Amenity, date: NaiveDate, time_slot: TimeSlot) -> RoomlyError {
    RoomlyError::Conflict(format!(
        "{} is already booked on {date} at {time_slot}",
        amenity.name
    ))
}
