//! Reservation endpoints.
//!
//! - `POST /api/reservations` - book a slot
//! - `POST /api/reservations/:id/cancel` - cancel one's own booking
//! - `POST /api/reservations/:id/grade` - admin grading
//! - `GET /api/users/:id/reservations` - a resident's bookings
//! - `GET /api/amenities/:id/reservations?date=` - bookings of one day
//! - `GET /api/amenities/:id/availability?date=` - free and taken slots
//! - `GET /api/audit/reservations?community_id=` - admin audit view

use super::CommunityFilter;
use crate::WebResult;
use crate::extractors::Actor;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use roomly_core::repository::{DataStore, ObjectStorage};
use roomly_core::types::{AmenityId, AuditEntry, GradeOutcome, Reservation, ReservationId, UserId};
use roomly_engine::{Booking, SlotAvailability};
use serde::Deserialize;

/// Request to book a slot.
#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    /// Amenity to book
    pub amenity_id: AmenityId,
    /// Day of the booking
    pub date: NaiveDate,
    /// Slot, `"HH:00-HH:00"`
    #[serde(default)]
    pub time_slot: String,
}

/// Request to grade a reservation.
#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    /// `FULFILLED` or `UNFULFILLED`
    pub outcome: GradeOutcome,
}

/// `?date=` parameter.
#[derive(Debug, Deserialize)]
pub struct DateQuery {
    /// Calendar day, `YYYY-MM-DD`
    pub date: NaiveDate,
}

/// Book a slot for the caller.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/reservations \
///   -H "X-User-Id: 2f7c..." -H "Content-Type: application/json" \
///   -d '{"amenity_id": "9a1e...", "date": "2025-01-08", "time_slot": "10:00-11:00"}'
/// ```
///
/// # Errors
///
/// 422 for a missing or unknown slot or a past date, 404 for an unknown
/// amenity, 409 when the slot is taken or the category rate limit applies.
pub async fn create_reservation<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Json(request): Json<CreateReservationRequest>,
) -> WebResult<(StatusCode, Json<Booking>)> {
    let booking = state
        .roomly
        .reservations
        .create(actor, request.amenity_id, request.date, &request.time_slot)
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Cancel one of the caller's reservations.
///
/// # Errors
///
/// 403 if the caller does not own it, 409 `INVALID_STATE` if it is not active.
pub async fn cancel_reservation<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Path(reservation_id): Path<ReservationId>,
) -> WebResult<Json<Reservation>> {
    let reservation = state.roomly.reservations.cancel(actor, reservation_id).await?;
    Ok(Json(reservation))
}

/// Grade a reservation (admins only).
///
/// # Errors
///
/// 403 for non-admins, 409 `INVALID_STATE` if already graded or cancelled.
pub async fn grade_reservation<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Path(reservation_id): Path<ReservationId>,
    Json(request): Json<GradeRequest>,
) -> WebResult<Json<Reservation>> {
    let reservation = state
        .roomly
        .reservations
        .grade(actor, reservation_id, request.outcome)
        .await?;
    Ok(Json(reservation))
}

/// A resident's reservations, latest first.
///
/// # Errors
///
/// 500 on store failure.
pub async fn list_user_reservations<S: DataStore, O: ObjectStorage>(
    State(state): State<AppState<S, O>>,
    Path(user_id): Path<UserId>,
) -> WebResult<Json<Vec<Reservation>>> {
    Ok(Json(state.roomly.reservations.list_for_user(user_id).await?))
}

/// Non-cancelled reservations of an amenity on one day.
///
/// # Errors
///
/// 500 on store failure.
pub async fn list_amenity_reservations<S: DataStore, O: ObjectStorage>(
    State(state): State<AppState<S, O>>,
    Path(amenity_id): Path<AmenityId>,
    Query(query): Query<DateQuery>,
) -> WebResult<Json<Vec<Reservation>>> {
    let reservations = state
        .roomly
        .reservations
        .list_for_amenity_on(amenity_id, query.date)
        .await?;
    Ok(Json(reservations))
}

/// Every bookable slot of an amenity on one day, with its availability.
///
/// # Errors
///
/// 404 for an unknown amenity.
pub async fn availability<S: DataStore, O: ObjectStorage>(
    State(state): State<AppState<S, O>>,
    Path(amenity_id): Path<AmenityId>,
    Query(query): Query<DateQuery>,
) -> WebResult<Json<Vec<SlotAvailability>>> {
    let slots = state
        .roomly
        .reservations
        .available_slots(amenity_id, query.date)
        .await?;
    Ok(Json(slots))
}

/// Reservations joined with amenity and resident, for the admin's own
/// community.
///
/// # Errors
///
/// 403 for non-admins and for another community's `community_id`.
pub async fn audit<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Query(filter): Query<CommunityFilter>,
) -> WebResult<Json<Vec<AuditEntry>>> {
    let entries = state
        .roomly
        .reservations
        .audit(actor, filter.community_id)
        .await?;
    Ok(Json(entries))
}
