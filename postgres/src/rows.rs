//! Row shapes as stored, and their conversion into domain types.
//!
//! Enumerations are stored as their `as_str` tags and small counters as
//! `INTEGER`/`SMALLINT`; a row that does not decode is a backend error.

use chrono::{DateTime, NaiveDate, Utc};
use roomly_core::error::{StoreError, StoreResult};
use roomly_core::types::{
    Amenity, AuditEntry, Comment, Community, JoinRequest, PointLog, Post, Reservation, User,
};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

pub(crate) const USER_COLUMNS: &str = "id, auth_id, email, name, role, community_id, tower, \
     apartment, avatar_url, points, status, created_at";

pub(crate) const COMMUNITY_COLUMNS: &str = "id, name, address, admin_email, total_floors, \
     units_per_floor, num_buildings, rooms_per_floor, total_points, created_at";

pub(crate) const AMENITY_COLUMNS: &str = "id, community_id, name, capacity, description, \
     image_url, category, points_reward, created_at";

pub(crate) const RESERVATION_COLUMNS: &str =
    "id, user_id, amenity_id, date, time_slot, status, grade, compliance_pct, created_at";

/// Reservation columns qualified with the `r` alias, for joins.
pub(crate) const RESERVATION_COLUMNS_R: &str = "r.id, r.user_id, r.amenity_id, r.date, \
     r.time_slot, r.status, r.grade, r.compliance_pct, r.created_at";

pub(crate) const POINT_LOG_COLUMNS: &str =
    "id, user_id, community_id, action, points, description, created_at";

pub(crate) const JOIN_REQUEST_COLUMNS: &str =
    "id, ticket_code, community_id, user_email, user_name, unit, tower, status, created_at";

pub(crate) const POST_COLUMNS: &str =
    "id, user_id, community_id, text, image_url, post_type, likes_count, created_at";

pub(crate) const COMMENT_COLUMNS: &str = "id, post_id, user_id, text, created_at";

fn parse<T>(value: &str) -> StoreResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| StoreError::Backend(format!("Corrupt row: {e}")))
}

fn unsigned(field: &str, value: i32) -> StoreResult<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::Backend(format!("Corrupt row: negative {field} {value}")))
}

/// Convert a counter for binding to an `INTEGER` column.
pub(crate) fn to_i32(field: &str, value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::Backend(format!("{field} {value} is too large")))
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    auth_id: Option<String>,
    email: String,
    name: String,
    role: String,
    community_id: Option<Uuid>,
    tower: Option<String>,
    apartment: Option<String>,
    avatar_url: Option<String>,
    points: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id.into(),
            auth_id: row.auth_id,
            email: row.email,
            name: row.name,
            role: parse(&row.role)?,
            community_id: row.community_id.map(Into::into),
            tower: row.tower,
            apartment: row.apartment,
            avatar_url: row.avatar_url,
            points: row.points,
            status: parse(&row.status)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommunityRow {
    id: Uuid,
    name: String,
    address: Option<String>,
    admin_email: String,
    total_floors: i32,
    units_per_floor: i32,
    num_buildings: i32,
    rooms_per_floor: i32,
    total_points: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<CommunityRow> for Community {
    type Error = StoreError;

    fn try_from(row: CommunityRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id.into(),
            name: row.name,
            address: row.address,
            admin_email: row.admin_email,
            total_floors: unsigned("total_floors", row.total_floors)?,
            units_per_floor: unsigned("units_per_floor", row.units_per_floor)?,
            num_buildings: unsigned("num_buildings", row.num_buildings)?,
            rooms_per_floor: unsigned("rooms_per_floor", row.rooms_per_floor)?,
            total_points: row.total_points,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct AmenityRow {
    id: Uuid,
    community_id: Option<Uuid>,
    name: String,
    capacity: i32,
    description: Option<String>,
    image_url: Option<String>,
    category: String,
    points_reward: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<AmenityRow> for Amenity {
    type Error = StoreError;

    fn try_from(row: AmenityRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id.into(),
            community_id: row.community_id.map(Into::into),
            name: row.name,
            capacity: unsigned("capacity", row.capacity)?,
            description: row.description,
            image_url: row.image_url,
            category: parse(&row.category)?,
            points_reward: row.points_reward,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ReservationRow {
    id: Uuid,
    user_id: Uuid,
    amenity_id: Uuid,
    date: NaiveDate,
    time_slot: String,
    status: String,
    grade: String,
    compliance_pct: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = StoreError;

    fn try_from(row: ReservationRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id.into(),
            user_id: row.user_id.into(),
            amenity_id: row.amenity_id.into(),
            date: row.date,
            time_slot: parse(&row.time_slot)?,
            status: parse(&row.status)?,
            grade: parse(&row.grade)?,
            compliance_pct: u8::try_from(row.compliance_pct).map_err(|_| {
                StoreError::Backend(format!("Corrupt row: compliance {}", row.compliance_pct))
            })?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct AuditRow {
    #[sqlx(flatten)]
    reservation: ReservationRow,
    amenity_name: String,
    amenity_community_id: Option<Uuid>,
    user_name: String,
    user_email: String,
    user_community_id: Option<Uuid>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> StoreResult<Self> {
        Ok(Self {
            reservation: row.reservation.try_into()?,
            amenity_name: row.amenity_name,
            amenity_community_id: row.amenity_community_id.map(Into::into),
            user_name: row.user_name,
            user_email: row.user_email,
            user_community_id: row.user_community_id.map(Into::into),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PointLogRow {
    id: Uuid,
    user_id: Uuid,
    community_id: Option<Uuid>,
    action: String,
    points: i64,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PointLogRow> for PointLog {
    fn from(row: PointLogRow) -> Self {
        Self {
            id: row.id.into(),
            user_id: row.user_id.into(),
            community_id: row.community_id.map(Into::into),
            action: row.action,
            points: row.points,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct JoinRequestRow {
    id: Uuid,
    ticket_code: String,
    community_id: Uuid,
    user_email: String,
    user_name: String,
    unit: Option<String>,
    tower: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<JoinRequestRow> for JoinRequest {
    type Error = StoreError;

    fn try_from(row: JoinRequestRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id.into(),
            ticket_code: row.ticket_code,
            community_id: row.community_id.into(),
            user_email: row.user_email,
            user_name: row.user_name,
            unit: row.unit,
            tower: row.tower,
            status: parse(&row.status)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    id: Uuid,
    user_id: Uuid,
    community_id: Uuid,
    text: String,
    image_url: Option<String>,
    post_type: String,
    likes_count: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = StoreError;

    fn try_from(row: PostRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id.into(),
            user_id: row.user_id.into(),
            community_id: row.community_id.into(),
            text: row.text,
            image_url: row.image_url,
            post_type: parse(&row.post_type)?,
            likes_count: row.likes_count,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    user_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id.into(),
            post_id: row.post_id.into(),
            user_id: row.user_id.into(),
            text: row.text,
            created_at: row.created_at,
        }
    }
}

/// Convert every row, failing on the first one that does not decode.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use roomly_core::types::{Grade, ReservationStatus};

    fn reservation_row(time_slot: &str, compliance_pct: i16) -> ReservationRow {
        ReservationRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amenity_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(),
            time_slot: time_slot.to_string(),
            status: "FINALIZED".to_string(),
            grade: "FULFILLED".to_string(),
            compliance_pct,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_reservation_row_decodes_tags() {
        let reservation = Reservation::try_from(reservation_row("10:00-11:00", 100)).unwrap();
        assert_eq!(reservation.status, ReservationStatus::Finalized);
        assert_eq!(reservation.grade, Grade::Fulfilled);
        assert_eq!(reservation.time_slot.start_hour(), 10);
        assert_eq!(reservation.compliance_pct, 100);
    }

    #[test]
    fn test_corrupt_rows_are_backend_errors() {
        assert!(matches!(
            Reservation::try_from(reservation_row("13:00-14:00", 0)),
            Err(StoreError::Backend(_))
        ));
        assert!(matches!(
            Reservation::try_from(reservation_row("10:00-11:00", -1)),
            Err(StoreError::Backend(_))
        ));
        assert!(unsigned("capacity", -3).is_err());
        assert_eq!(to_i32("capacity", 12).unwrap(), 12);
        assert!(to_i32("capacity", u32::MAX).is_err());
    }
}
