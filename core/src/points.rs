//! Point schedule and level table.
//!
//! The schedule is a closed enumeration: callers name an action, the amount
//! comes from here. The only per-call input is the amenity reward override
//! for completed reservations.

use crate::types::Amenity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every action that earns points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointAction {
    /// Uploading a profile photo
    ProfilePhoto,
    /// Publishing a photo of a community area
    UploadAreaPhoto,
    /// Writing a comment or a plain post
    Comment,
    /// Reporting a bug
    BugReport,
    /// Booking an amenity
    ReservationCompleted,
    /// Receiving a like on one's post
    LikeReceived,
}

impl PointAction {
    /// All actions, in schedule order.
    pub const ALL: [Self; 6] = [
        Self::ProfilePhoto,
        Self::UploadAreaPhoto,
        Self::Comment,
        Self::BugReport,
        Self::ReservationCompleted,
        Self::LikeReceived,
    ];

    /// Ledger action code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ProfilePhoto => "PROFILE_PHOTO",
            Self::UploadAreaPhoto => "UPLOAD_AREA_PHOTO",
            Self::Comment => "COMMENT",
            Self::BugReport => "BUG_REPORT",
            Self::ReservationCompleted => "RESERVATION_COMPLETED",
            Self::LikeReceived => "LIKE_RECEIVED",
        }
    }

    /// Default amount for this action.
    #[must_use]
    pub const fn base_points(&self) -> i64 {
        match self {
            Self::ProfilePhoto => 20,
            Self::UploadAreaPhoto => 15,
            Self::Comment => 5,
            Self::BugReport => 25,
            Self::ReservationCompleted => 10,
            Self::LikeReceived => 2,
        }
    }

    /// Default ledger description.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ProfilePhoto => "Profile photo uploaded",
            Self::UploadAreaPhoto => "Community area photo uploaded",
            Self::Comment => "Comment in the community",
            Self::BugReport => "Bug reported",
            Self::ReservationCompleted => "Amenity reservation",
            Self::LikeReceived => "Like received",
        }
    }
}

impl fmt::Display for PointAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PointAction {
    type Err = crate::types::ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.code() == s)
            .ok_or_else(|| crate::types::ParseTagError {
                kind: "point action",
                value: s.to_string(),
            })
    }
}

/// What a single award is for. Resolving it yields the amount.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AwardReason<'a> {
    /// A fixed-amount action
    Action(PointAction),
    /// A reservation of this amenity (its reward overrides the default)
    Reservation(&'a Amenity),
}

impl AwardReason<'_> {
    /// The action recorded in the ledger.
    #[must_use]
    pub const fn action(&self) -> PointAction {
        match self {
            Self::Action(action) => *action,
            Self::Reservation(_) => PointAction::ReservationCompleted,
        }
    }

    /// Amount to award.
    #[must_use]
    pub fn points(&self) -> i64 {
        match self {
            Self::Action(action) => action.base_points(),
            Self::Reservation(amenity) if amenity.points_reward > 0 => amenity.points_reward,
            Self::Reservation(_) => PointAction::ReservationCompleted.base_points(),
        }
    }

    /// Ledger description.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Action(action) => action.label().to_string(),
            Self::Reservation(amenity) => format!("Reservation at {}", amenity.name),
        }
    }
}

// ============================================================================
// Levels
// ============================================================================

/// A gamification tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Level {
    /// Zero-based rank of the tier (0 = base tier)
    pub rank: u8,
    /// Display name
    pub name: &'static str,
    /// Display colour
    pub color: &'static str,
    /// Icon
    pub icon: &'static str,
    /// Minimum points to reach this tier (inclusive)
    pub min_points: i64,
}

/// Tier table, highest threshold first.
pub const LEVELS: [Level; 4] = [
    Level {
        rank: 3,
        name: "Legend",
        color: "#a855f7",
        icon: "👑",
        min_points: 500,
    },
    Level {
        rank: 2,
        name: "Community Leader",
        color: "#7c3aed",
        icon: "⭐",
        min_points: 200,
    },
    Level {
        rank: 1,
        name: "Active Neighbor",
        color: "#8b5cf6",
        icon: "🏠",
        min_points: 50,
    },
    Level {
        rank: 0,
        name: "New Neighbor",
        color: "#a78bfa",
        icon: "🌱",
        min_points: 0,
    },
];

/// Tier for a point total. Thresholds are inclusive; negative totals map to the base tier.
#[must_use]
pub fn level_for(points: i64) -> Level {
    LEVELS
        .iter()
        .find(|level| points >= level.min_points)
        .copied()
        .unwrap_or(LEVELS[LEVELS.len() - 1])
}

/// Points still missing to reach the next tier, or `None` at the top tier.
#[must_use]
pub fn points_to_next_level(points: i64) -> Option<i64> {
    let current = level_for(points);
    LEVELS
        .iter()
        .rev()
        .find(|level| level.rank == current.rank + 1)
        .map(|next| next.min_points - points)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{AmenityCategory, CommunityId};
    use chrono::Utc;
    use proptest::prelude::*;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(level_for(0).rank, 0);
        assert_eq!(level_for(49).rank, 0);
        assert_eq!(level_for(50).rank, 1);
        assert_eq!(level_for(199).rank, 1);
        assert_eq!(level_for(200).rank, 2);
        assert_eq!(level_for(499).rank, 2);
        assert_eq!(level_for(500).rank, 3);
        assert_eq!(level_for(10_000).name, "Legend");
        assert_eq!(level_for(-5).rank, 0);
    }

    #[test]
    fn test_points_to_next_level() {
        assert_eq!(points_to_next_level(0), Some(50));
        assert_eq!(points_to_next_level(199), Some(1));
        assert_eq!(points_to_next_level(500), None);
    }

    #[test]
    fn test_schedule_amounts() {
        assert_eq!(PointAction::ProfilePhoto.base_points(), 20);
        assert_eq!(PointAction::UploadAreaPhoto.base_points(), 15);
        assert_eq!(PointAction::Comment.base_points(), 5);
        assert_eq!(PointAction::BugReport.base_points(), 25);
        assert_eq!(PointAction::ReservationCompleted.base_points(), 10);
        assert_eq!(PointAction::LikeReceived.base_points(), 2);
    }

    #[test]
    fn test_reservation_reward_override() {
        let mut pool = Amenity::new(
            Some(CommunityId::new()),
            "Pool",
            AmenityCategory::Pool,
            30,
            Utc::now(),
        );
        assert_eq!(AwardReason::Reservation(&pool).points(), 10);

        pool.points_reward = 50;
        let reason = AwardReason::Reservation(&pool);
        assert_eq!(reason.points(), 50);
        assert_eq!(reason.action(), PointAction::ReservationCompleted);
        assert_eq!(reason.description(), "Reservation at Pool");
    }

    #[test]
    fn test_action_codes_parse_back() {
        for action in PointAction::ALL {
            assert_eq!(action.code().parse::<PointAction>().unwrap(), action);
        }
        assert!("LIKE_GIVEN".parse::<PointAction>().is_err());
    }

    proptest! {
        #[test]
        fn prop_level_is_monotonic(a in -1_000i64..10_000, b in -1_000i64..10_000) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(level_for(low).rank <= level_for(high).rank);
        }

        #[test]
        fn prop_level_threshold_never_exceeds_points(points in 0i64..100_000) {
            prop_assert!(level_for(points).min_points <= points);
        }
    }
}
