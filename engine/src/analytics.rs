//! Admin analytics over reservations, residents and posts.

use crate::access::{admin_scope, require_admin};
use roomly_core::error::Result;
use roomly_core::repository::DataStore;
use roomly_core::types::{AmenityId, CommunityId, Grade, UserId};
use serde::Serialize;
use std::collections::HashMap;

/// Reservations per amenity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmenityUsage {
    /// Amenity
    pub amenity_id: AmenityId,
    /// Display name
    pub name: String,
    /// Reservations of any status
    pub reservations: u64,
}

/// Aggregate figures for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsReport {
    /// Reservations of any status
    pub total_reservations: u64,
    /// Reservations graded `FULFILLED`
    pub fulfilled_reservations: u64,
    /// Reservations with any grade other than `PENDING`
    pub audited_reservations: u64,
    /// `round(fulfilled / total × 100)`, 0 without reservations
    pub occupancy_rate: u8,
    /// Active accounts
    pub active_users: u64,
    /// Feed posts
    pub total_posts: u64,
    /// Per-amenity counts, busiest first
    pub by_amenity: Vec<AmenityUsage>,
}

/// Computes [`AnalyticsReport`]s.
pub struct Analytics<S> {
    store: S,
}

impl<S: DataStore> Analytics<S> {
    /// Create a new analytics service
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Build the report for the admin's community.
    ///
    /// Reservations count when their amenity belongs to the community and
    /// users count when they are members. An explicit `community_id` must
    /// name the admin's own community.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins and for other communities, `Store` on
    /// store failure.
    pub async fn report(
        &self,
        actor: UserId,
        community_id: Option<CommunityId>,
    ) -> Result<AnalyticsReport> {
        let admin = require_admin(&self.store, actor, "view analytics").await?;
        let community_id = Some(admin_scope(&admin, community_id, "view analytics")?);

        let entries: Vec<_> = self
            .store
            .audit_reservations(community_id)
            .await?
            .into_iter()
            .filter(|e| e.amenity_community_id == community_id)
            .collect();

        let total = entries.len() as u64;
        let fulfilled = entries
            .iter()
            .filter(|e| e.reservation.grade == Grade::Fulfilled)
            .count() as u64;
        let audited = entries
            .iter()
            .filter(|e| e.reservation.grade != Grade::Pending)
            .count() as u64;

        let mut usage: HashMap<AmenityId, AmenityUsage> = HashMap::new();
        for entry in &entries {
            usage
                .entry(entry.reservation.amenity_id)
                .or_insert_with(|| AmenityUsage {
                    amenity_id: entry.reservation.amenity_id,
                    name: entry.amenity_name.clone(),
                    reservations: 0,
                })
                .reservations += 1;
        }
        let mut by_amenity: Vec<AmenityUsage> = usage.into_values().collect();
        by_amenity.sort_by(|a, b| {
            b.reservations
                .cmp(&a.reservations)
                .then_with(|| a.name.cmp(&b.name))
        });

        let active_users = self
            .store
            .list_users()
            .await?
            .iter()
            .filter(|u| u.is_active())
            .filter(|u| u.community_id == community_id)
            .count() as u64;
        let total_posts = self.store.count_posts(community_id).await?;

        Ok(AnalyticsReport {
            total_reservations: total,
            fulfilled_reservations: fulfilled,
            audited_reservations: audited,
            occupancy_rate: occupancy_rate(fulfilled, total),
            active_users,
            total_posts,
            by_amenity,
        })
    }
}

/// Percentage of fulfilled reservations, rounded half away from zero.
#[must_use]
pub fn occupancy_rate(fulfilled: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (fulfilled.min(total) * 200 + total) / (total * 2);
    u8::try_from(pct).unwrap_or(100)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::points::PointsCoordinator;
    use crate::reservations::ReservationManager;
    use crate::BookingPolicy;
    use chrono::Duration;
    use proptest::prelude::*;
    use roomly_core::environment::Clock;
    use roomly_core::error::RoomlyError;
    use roomly_core::types::GradeOutcome;
    use roomly_testing::{Fixtures, InMemoryStore, test_clock};
    use std::sync::Arc;

    #[test]
    fn test_occupancy_rounding() {
        assert_eq!(occupancy_rate(0, 0), 0);
        assert_eq!(occupancy_rate(1, 3), 33);
        assert_eq!(occupancy_rate(2, 3), 67);
        assert_eq!(occupancy_rate(1, 2), 50);
        assert_eq!(occupancy_rate(1, 8), 13);
        assert_eq!(occupancy_rate(5, 5), 100);
    }

    proptest! {
        #[test]
        fn prop_occupancy_is_a_percentage(total in 0u64..10_000, fulfilled in 0u64..10_000) {
            let rate = occupancy_rate(fulfilled.min(total), total);
            prop_assert!(rate <= 100);
        }
    }

    #[tokio::test]
    async fn test_report_counts() {
        let store = InMemoryStore::new();
        let fx = Fixtures::seed(&store, &test_clock()).await.unwrap();
        let clock: Arc<dyn Clock> = Arc::new(test_clock());
        let points = Arc::new(PointsCoordinator::new(store.clone(), Arc::clone(&clock)));
        let manager =
            ReservationManager::new(store.clone(), points, clock, BookingPolicy::default());
        let tomorrow = test_clock().today() + Duration::days(1);

        let a = manager
            .create(fx.alice.id, fx.gym.id, tomorrow, "08:00-09:00")
            .await
            .unwrap();
        let b = manager
            .create(fx.bob.id, fx.gym.id, tomorrow, "09:00-10:00")
            .await
            .unwrap();
        manager
            .create(fx.bob.id, fx.grill.id, tomorrow, "09:00-10:00")
            .await
            .unwrap();
        manager
            .grade(fx.admin.id, a.record.id, GradeOutcome::Fulfilled)
            .await
            .unwrap();
        manager
            .grade(fx.admin.id, b.record.id, GradeOutcome::Unfulfilled)
            .await
            .unwrap();

        let (_, other_admin) = Fixtures::seed_other_tower(&store, &test_clock()).await.unwrap();
        let analytics = Analytics::new(store);
        let report = analytics.report(fx.admin.id, Some(fx.community.id)).await.unwrap();
        assert_eq!(analytics.report(fx.admin.id, None).await.unwrap(), report);

        assert_eq!(report.total_reservations, 3);
        assert_eq!(report.fulfilled_reservations, 1);
        assert_eq!(report.audited_reservations, 2);
        assert_eq!(report.occupancy_rate, 33);
        assert_eq!(report.active_users, 3);
        assert_eq!(report.total_posts, 0);
        assert_eq!(report.by_amenity[0].name, "Gym");
        assert_eq!(report.by_amenity[0].reservations, 2);

        assert!(matches!(
            analytics.report(fx.alice.id, None).await,
            Err(RoomlyError::Forbidden(_))
        ));

        // Another tower's admin sees only their own, empty, community.
        assert!(matches!(
            analytics.report(other_admin.id, Some(fx.community.id)).await,
            Err(RoomlyError::Forbidden(_))
        ));
        let theirs = analytics.report(other_admin.id, None).await.unwrap();
        assert_eq!(theirs.total_reservations, 0);
        assert_eq!(theirs.active_users, 1);
    }
}
