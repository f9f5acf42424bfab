//! Domain types for Roomly.
//!
//! Identifiers, entities and the small enumerations that describe their
//! lifecycle. Everything here is plain data: no I/O, no clocks.

use crate::slot::TimeSlot;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a resident or admin account
    UserId
);
define_id!(
    /// Unique identifier for a community (tower / condominium)
    CommunityId
);
define_id!(
    /// Unique identifier for a bookable amenity
    AmenityId
);
define_id!(
    /// Unique identifier for a reservation
    ReservationId
);
define_id!(
    /// Unique identifier for a ledger entry
    PointLogId
);
define_id!(
    /// Unique identifier for a join request
    JoinRequestId
);
define_id!(
    /// Unique identifier for a feed post
    PostId
);
define_id!(
    /// Unique identifier for a comment on a post
    CommentId
);

/// Error returned when parsing one of the string-tagged enums fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseTagError {
    /// Which enumeration was being parsed
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
}

impl ParseTagError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

macro_rules! string_tags {
    ($name:ident, $kind:literal, { $($variant:ident => $tag:literal),+ $(,)? }) => {
        impl $name {
            /// Stable tag used in storage and on the wire
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $tag,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseTagError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok(Self::$variant),)+
                    other => Err(ParseTagError::new($kind, other)),
                }
            }
        }
    };
}

// ============================================================================
// Users
// ============================================================================

/// Account role
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular resident
    Resident,
    /// Community administrator
    Admin,
}

string_tags!(Role, "role", { Resident => "RESIDENT", Admin => "ADMIN" });

/// Account status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    /// Can book, post and earn points
    Active,
    /// Disabled by an admin
    Inactive,
}

string_tags!(UserStatus, "user status", { Active => "ACTIVE", Inactive => "INACTIVE" });

/// A resident or admin profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: UserId,
    /// Identity in the external authentication provider
    pub auth_id: Option<String>,
    /// Login e-mail (unique)
    pub email: String,
    /// Display name
    pub name: String,
    /// Role
    pub role: Role,
    /// Community membership, once a join request is approved
    pub community_id: Option<CommunityId>,
    /// Tower / building within the community
    pub tower: Option<String>,
    /// Apartment / unit
    pub apartment: Option<String>,
    /// Public URL of the profile photo
    pub avatar_url: Option<String>,
    /// Cached point total (derived from the ledger)
    pub points: i64,
    /// Account status
    pub status: UserStatus,
    /// When the profile was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new active resident with zero points and no community.
    #[must_use]
    pub fn new(email: impl Into<String>, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            auth_id: None,
            email: email.into(),
            name: name.into(),
            role: Role::Resident,
            community_id: None,
            tower: None,
            apartment: None,
            avatar_url: None,
            points: 0,
            status: UserStatus::Active,
            created_at,
        }
    }

    /// Returns `true` for admins.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Returns `true` when the account is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

// ============================================================================
// Communities
// ============================================================================

/// A tower / condominium whose residents share amenities and a leaderboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    /// Community ID
    pub id: CommunityId,
    /// Name
    pub name: String,
    /// Street address
    pub address: Option<String>,
    /// E-mail of the administrator who registered the tower
    pub admin_email: String,
    /// Floors per building
    pub total_floors: u32,
    /// Units per floor
    pub units_per_floor: u32,
    /// Number of buildings
    pub num_buildings: u32,
    /// Rooms per floor
    pub rooms_per_floor: u32,
    /// Cached sum of every ledger entry attributed to this community
    pub total_points: i64,
    /// When the community was registered
    pub created_at: DateTime<Utc>,
}

impl Community {
    /// Creates a single-building community with zero points.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        admin_email: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CommunityId::new(),
            name: name.into(),
            address: None,
            admin_email: admin_email.into(),
            total_floors: 1,
            units_per_floor: 1,
            num_buildings: 1,
            rooms_per_floor: 1,
            total_points: 0,
            created_at,
        }
    }
}

// ============================================================================
// Amenities
// ============================================================================

/// Explicit amenity category.
///
/// Booking rules key off this tag, never off the display name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmenityCategory {
    /// Swimming pool
    Pool,
    /// Gym
    Gym,
    /// Grill / BBQ area
    Grill,
    /// Event hall
    EventHall,
    /// Coworking space
    Coworking,
    /// Sports court
    Court,
    /// Garden
    Garden,
    /// Parking
    Parking,
    /// Anything else
    Other,
}

string_tags!(AmenityCategory, "amenity category", {
    Pool => "POOL",
    Gym => "GYM",
    Grill => "GRILL",
    EventHall => "EVENT_HALL",
    Coworking => "COWORKING",
    Court => "COURT",
    Garden => "GARDEN",
    Parking => "PARKING",
    Other => "OTHER",
});

/// A bookable shared space.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amenity {
    /// Amenity ID
    pub id: AmenityId,
    /// Owning community (`None` for amenities shared across towers)
    pub community_id: Option<CommunityId>,
    /// Display name
    pub name: String,
    /// Maximum people at once
    pub capacity: u32,
    /// Free-text description
    pub description: Option<String>,
    /// Public URL of the cover image
    pub image_url: Option<String>,
    /// Category tag
    pub category: AmenityCategory,
    /// Points granted per reservation (0 means "use the default")
    pub points_reward: i64,
    /// When the amenity was created
    pub created_at: DateTime<Utc>,
}

impl Amenity {
    /// Creates an amenity with the default reward.
    #[must_use]
    pub fn new(
        community_id: Option<CommunityId>,
        name: impl Into<String>,
        category: AmenityCategory,
        capacity: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AmenityId::new(),
            community_id,
            name: name.into(),
            capacity,
            description: None,
            image_url: None,
            category,
            points_reward: 0,
            created_at,
        }
    }
}

// ============================================================================
// Reservations
// ============================================================================

/// Reservation lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Booked, holds the slot
    Active,
    /// Cancelled by the resident, releases the slot
    Cancelled,
    /// Graded by an admin, keeps holding the slot
    Finalized,
}

string_tags!(ReservationStatus, "reservation status", {
    Active => "ACTIVE",
    Cancelled => "CANCELLED",
    Finalized => "FINALIZED",
});

impl ReservationStatus {
    /// Whether a reservation in this status occupies its slot.
    #[must_use]
    pub const fn holds_slot(&self) -> bool {
        matches!(self, Self::Active | Self::Finalized)
    }
}

/// Post-hoc compliance grade
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grade {
    /// Not graded yet
    Pending,
    /// The resident used the slot as booked
    Fulfilled,
    /// The resident did not show up / broke the rules
    Unfulfilled,
}

string_tags!(Grade, "grade", {
    Pending => "PENDING",
    Fulfilled => "FULFILLED",
    Unfulfilled => "UNFULFILLED",
});

/// Outcome an admin may assign when grading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradeOutcome {
    /// Reservation was honoured
    Fulfilled,
    /// Reservation was not honoured
    Unfulfilled,
}

impl GradeOutcome {
    /// The grade recorded for this outcome.
    #[must_use]
    pub const fn grade(self) -> Grade {
        match self {
            Self::Fulfilled => Grade::Fulfilled,
            Self::Unfulfilled => Grade::Unfulfilled,
        }
    }

    /// Compliance percentage stored alongside the grade.
    #[must_use]
    pub const fn compliance_pct(self) -> u8 {
        match self {
            Self::Fulfilled => 100,
            Self::Unfulfilled => 0,
        }
    }
}

/// A booking of one amenity slot on one day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Reservation ID
    pub id: ReservationId,
    /// Who booked
    pub user_id: UserId,
    /// What was booked
    pub amenity_id: AmenityId,
    /// Calendar day
    pub date: NaiveDate,
    /// Hour-long slot
    pub time_slot: TimeSlot,
    /// Lifecycle status
    pub status: ReservationStatus,
    /// Compliance grade
    pub grade: Grade,
    /// Compliance percentage (0 until graded)
    pub compliance_pct: u8,
    /// When the booking was made
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Creates a new `ACTIVE` / `PENDING` reservation.
    #[must_use]
    pub fn new(
        user_id: UserId,
        amenity_id: AmenityId,
        date: NaiveDate,
        time_slot: TimeSlot,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReservationId::new(),
            user_id,
            amenity_id,
            date,
            time_slot,
            status: ReservationStatus::Active,
            grade: Grade::Pending,
            compliance_pct: 0,
            created_at,
        }
    }

    /// The exclusivity key of this reservation.
    #[must_use]
    pub const fn slot_key(&self) -> SlotKey {
        SlotKey {
            amenity_id: self.amenity_id,
            date: self.date,
            time_slot: self.time_slot,
        }
    }
}

/// `(amenity, date, slot)`: at most one slot-holding reservation per key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    /// Amenity
    pub amenity_id: AmenityId,
    /// Day
    pub date: NaiveDate,
    /// Slot
    pub time_slot: TimeSlot,
}

/// A reservation joined with the amenity and user it references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// The reservation
    pub reservation: Reservation,
    /// Amenity display name
    pub amenity_name: String,
    /// Community owning the amenity
    pub amenity_community_id: Option<CommunityId>,
    /// Resident display name
    pub user_name: String,
    /// Resident e-mail
    pub user_email: String,
    /// Resident community
    pub user_community_id: Option<CommunityId>,
}

// ============================================================================
// Points ledger
// ============================================================================

/// One append-only ledger row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointLog {
    /// Entry ID
    pub id: PointLogId,
    /// Who earned the points
    pub user_id: UserId,
    /// Community credited (if the user belongs to one)
    pub community_id: Option<CommunityId>,
    /// Action code, e.g. `RESERVATION_COMPLETED`
    pub action: String,
    /// Signed amount
    pub points: i64,
    /// Optional human-readable description
    pub description: Option<String>,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Join requests
// ============================================================================

/// Join request status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinRequestStatus {
    /// Waiting for an admin
    Pending,
    /// Accepted
    Approved,
    /// Declined
    Rejected,
}

string_tags!(JoinRequestStatus, "join request status", {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

/// A prospective resident's application to a community.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Request ID
    pub id: JoinRequestId,
    /// Short code the applicant can quote to the admin
    pub ticket_code: String,
    /// Target community
    pub community_id: CommunityId,
    /// Applicant e-mail
    pub user_email: String,
    /// Applicant name
    pub user_name: String,
    /// Requested unit
    pub unit: Option<String>,
    /// Requested tower
    pub tower: Option<String>,
    /// Decision status
    pub status: JoinRequestStatus,
    /// When the request was submitted
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Feed
// ============================================================================

/// Post type, which determines the points earned for publishing it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostType {
    /// Plain text post
    General,
    /// Photo of a community area
    AreaPhoto,
    /// Report of a problem in the building or the app
    BugReport,
}

string_tags!(PostType, "post type", {
    General => "GENERAL",
    AreaPhoto => "AREA_PHOTO",
    BugReport => "BUG_REPORT",
});

/// A community feed post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post ID
    pub id: PostId,
    /// Author
    pub user_id: UserId,
    /// Community feed the post belongs to
    pub community_id: CommunityId,
    /// Body
    pub text: String,
    /// Attached image
    pub image_url: Option<String>,
    /// Post type
    pub post_type: PostType,
    /// Cached like count
    pub likes_count: i64,
    /// When the post was published
    pub created_at: DateTime<Utc>,
}

/// A comment on a post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment ID
    pub id: CommentId,
    /// Parent post
    pub post_id: PostId,
    /// Author
    pub user_id: UserId,
    /// Body
    pub text: String,
    /// When the comment was written
    pub created_at: DateTime<Utc>,
}
