//! Leaderboards and per-user point summaries.
//!
//! Communities rank by raw `total_points`; residents rank by their cached
//! total and carry the level derived from it.

use crate::access::load_user;
use roomly_core::error::{Result, RoomlyError};
use roomly_core::points::{Level, level_for, points_to_next_level};
use roomly_core::repository::DataStore;
use roomly_core::types::{CommunityId, PointLog, UserId};
use serde::Serialize;

/// One row of the community ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommunityStanding {
    /// 1-based position
    pub rank: usize,
    /// Community
    pub community_id: CommunityId,
    /// Name
    pub name: String,
    /// Cached total
    pub total_points: i64,
}

/// One row of a community's resident ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResidentStanding {
    /// 1-based position
    pub rank: usize,
    /// Resident
    pub user_id: UserId,
    /// Display name
    pub name: String,
    /// Tower
    pub tower: Option<String>,
    /// Apartment
    pub apartment: Option<String>,
    /// Profile photo
    pub avatar_url: Option<String>,
    /// Cached total
    pub points: i64,
    /// Tier derived from `points`
    pub level: Level,
}

/// A user's points, tier and ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointsSummary {
    /// User
    pub user_id: UserId,
    /// Cached total
    pub points: i64,
    /// Current tier
    pub level: Level,
    /// Points missing for the next tier (`None` at the top)
    pub points_to_next_level: Option<i64>,
    /// Ledger entries, newest first
    pub history: Vec<PointLog>,
}

/// Read-only ranking queries.
pub struct Leaderboard<S> {
    store: S,
}

impl<S: DataStore> Leaderboard<S> {
    /// Create a new leaderboard
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Every community, highest total first (ties by name).
    ///
    /// # Errors
    ///
    /// Returns `Store` on store failure.
    pub async fn community_leaderboard(&self) -> Result<Vec<CommunityStanding>> {
        let mut communities = self.store.list_communities().await?;
        communities.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(communities
            .into_iter()
            .enumerate()
            .map(|(i, c)| CommunityStanding {
                rank: i + 1,
                community_id: c.id,
                name: c.name,
                total_points: c.total_points,
            })
            .collect())
    }

    /// Active residents of a community, highest total first.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown community, `Store` on store failure.
    pub async fn resident_leaderboard(
        &self,
        community_id: CommunityId,
    ) -> Result<Vec<ResidentStanding>> {
        if self.store.get_community(community_id).await?.is_none() {
            return Err(RoomlyError::not_found("community", community_id));
        }

        let members = self.store.list_community_members(community_id, true).await?;
        Ok(members
            .into_iter()
            .enumerate()
            .map(|(i, u)| ResidentStanding {
                rank: i + 1,
                user_id: u.id,
                level: level_for(u.points),
                name: u.name,
                tower: u.tower,
                apartment: u.apartment,
                avatar_url: u.avatar_url,
                points: u.points,
            })
            .collect())
    }

    /// A user's total, tier and point history.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown user, `Store` on store failure.
    pub async fn point_summary(&self, user_id: UserId) -> Result<PointsSummary> {
        let user = load_user(&self.store, user_id).await?;
        let history = self.store.list_user_point_logs(user_id).await?;

        Ok(PointsSummary {
            user_id,
            points: user.points,
            level: level_for(user.points),
            points_to_next_level: points_to_next_level(user.points),
            history,
        })
    }
}
