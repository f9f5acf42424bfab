//! In-memory implementation of every repository trait.
//!
//! All tables live behind one mutex, so each repository call is atomic the
//! way a single SQL statement is. In particular the slot-exclusivity check and
//! the insert happen under the same lock, which makes concurrent booking
//! tests meaningful.
//!
//! Failures can be injected per operation with [`InMemoryStore::fail_on`] to
//! exercise partial-failure paths.

use roomly_core::error::{
    LIKE_CONSTRAINT, SLOT_CONSTRAINT, StoreError, StoreResult, USER_EMAIL_CONSTRAINT,
};
use roomly_core::repository::{
    AmenityRepository, CommunityRepository, FeedRepository, JoinRequestRepository, PointLedger,
    ReservationRepository, UserRepository,
};
use roomly_core::types::{
    Amenity, AmenityCategory, AmenityId, AuditEntry, Comment, Community, CommunityId, Grade,
    GradeOutcome, JoinRequest, JoinRequestId, JoinRequestStatus, PointLog, Post, PostId,
    Reservation, ReservationId, ReservationStatus, User, UserId, UserStatus,
};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Operations that can be made to fail on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// `PointLedger::append_point_log`
    AppendPointLog,
    /// `UserRepository::add_user_points`
    AddUserPoints,
    /// `CommunityRepository::add_community_points`
    AddCommunityPoints,
    /// `ReservationRepository::insert_reservation`
    InsertReservation,
    /// `JoinRequestRepository::decide_join_request`
    DecideJoinRequest,
    /// `FeedRepository::claim_like_reward`
    ClaimLikeReward,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    communities: HashMap<CommunityId, Community>,
    amenities: HashMap<AmenityId, Amenity>,
    reservations: HashMap<ReservationId, Reservation>,
    point_logs: Vec<PointLog>,
    join_requests: HashMap<JoinRequestId, JoinRequest>,
    posts: HashMap<PostId, Post>,
    comments: Vec<Comment>,
    likes: HashSet<(PostId, UserId)>,
    like_rewards: HashSet<(PostId, UserId)>,
    failures: HashSet<FailPoint>,
}

impl Tables {
    fn check(&self, point: FailPoint) -> StoreResult<()> {
        if self.failures.contains(&point) {
            return Err(StoreError::Backend(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

/// In-memory data store for fast, deterministic tests.
///
/// Cloning shares the underlying tables.
///
/// # Example
///
/// ```
/// use roomly_testing::InMemoryStore;
/// use roomly_core::repository::UserRepository;
/// use roomly_core::types::User;
/// use chrono::Utc;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new();
/// let user = store.insert_user(&User::new("ana@example.com", "Ana", Utc::now())).await.unwrap();
/// assert_eq!(store.get_user(user.id).await.unwrap(), Some(user));
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("Mutex lock failed".into()))
    }

    /// Make every subsequent call of `point` fail with a backend error.
    pub fn fail_on(&self, point: FailPoint) {
        if let Ok(mut tables) = self.lock() {
            tables.failures.insert(point);
        }
    }

    /// Stop injecting failures for `point`.
    pub fn heal(&self, point: FailPoint) {
        if let Ok(mut tables) = self.lock() {
            tables.failures.remove(&point);
        }
    }

    /// Number of ledger entries across all users.
    #[must_use]
    pub fn point_log_count(&self) -> usize {
        self.lock().map_or(0, |tables| tables.point_logs.len())
    }

    /// Every reservation, in no particular order.
    #[must_use]
    pub fn reservations(&self) -> Vec<Reservation> {
        self.lock()
            .map(|tables| tables.reservations.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Overwrite a user's cached total without touching the ledger.
    ///
    /// Used to simulate drift between the ledger and the aggregates.
    pub fn corrupt_user_points(&self, user_id: UserId, total: i64) {
        if let Ok(mut tables) = self.lock() {
            if let Some(user) = tables.users.get_mut(&user_id) {
                user.points = total;
            }
        }
    }

    /// Rewrite a reservation's creation time, e.g. to age it past a rate-limit window.
    pub fn backdate_reservation(
        &self,
        reservation_id: ReservationId,
        created_at: chrono::DateTime<chrono::Utc>,
    ) {
        if let Ok(mut tables) = self.lock() {
            if let Some(reservation) = tables.reservations.get_mut(&reservation_id) {
                reservation.created_at = created_at;
            }
        }
    }
}

impl UserRepository for InMemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<User> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation {
                constraint: USER_EMAIL_CONSTRAINT.to_string(),
            });
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let mut tables = self.lock()?;
        let stored = tables.users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        let points = stored.points;
        let created_at = stored.created_at;
        *stored = User {
            points,
            created_at,
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn set_user_status(&self, user_id: UserId, status: UserStatus) -> StoreResult<User> {
        let mut tables = self.lock()?;
        let stored = tables.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        stored.status = status;
        Ok(stored.clone())
    }

    async fn add_user_points(&self, user_id: UserId, delta: i64) -> StoreResult<Option<i64>> {
        let mut tables = self.lock()?;
        tables.check(FailPoint::AddUserPoints)?;
        let Some(user) = tables.users.get_mut(&user_id) else {
            return Ok(None);
        };
        user.points = user
            .points
            .checked_add(delta)
            .ok_or_else(|| StoreError::Backend(format!("points total of user {user_id} overflows")))?;
        Ok(Some(user.points))
    }

    async fn set_user_points(&self, user_id: UserId, total: i64) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        Ok(tables
            .users
            .get_mut(&user_id)
            .map(|user| user.points = total)
            .is_some())
    }

    async fn list_community_members(
        &self,
        community_id: CommunityId,
        active_only: bool,
    ) -> StoreResult<Vec<User>> {
        let tables = self.lock()?;
        let mut members: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.community_id == Some(community_id))
            .filter(|u| !active_only || u.is_active())
            .cloned()
            .collect();
        members.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.name.cmp(&b.name)));
        Ok(members)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.lock()?;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}

impl CommunityRepository for InMemoryStore {
    async fn insert_community(&self, community: &Community) -> StoreResult<Community> {
        self.lock()?
            .communities
            .insert(community.id, community.clone());
        Ok(community.clone())
    }

    async fn get_community(&self, community_id: CommunityId) -> StoreResult<Option<Community>> {
        Ok(self.lock()?.communities.get(&community_id).cloned())
    }

    async fn list_communities(&self) -> StoreResult<Vec<Community>> {
        let tables = self.lock()?;
        let mut communities: Vec<Community> = tables.communities.values().cloned().collect();
        communities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(communities)
    }

    async fn add_community_points(
        &self,
        community_id: CommunityId,
        delta: i64,
    ) -> StoreResult<Option<i64>> {
        let mut tables = self.lock()?;
        tables.check(FailPoint::AddCommunityPoints)?;
        let Some(community) = tables.communities.get_mut(&community_id) else {
            return Ok(None);
        };
        community.total_points = community.total_points.checked_add(delta).ok_or_else(|| {
            StoreError::Backend(format!("points total of community {community_id} overflows"))
        })?;
        Ok(Some(community.total_points))
    }

    async fn set_community_points(&self, community_id: CommunityId, total: i64) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        Ok(tables
            .communities
            .get_mut(&community_id)
            .map(|community| community.total_points = total)
            .is_some())
    }
}

impl AmenityRepository for InMemoryStore {
    async fn insert_amenity(&self, amenity: &Amenity) -> StoreResult<Amenity> {
        self.lock()?.amenities.insert(amenity.id, amenity.clone());
        Ok(amenity.clone())
    }

    async fn get_amenity(&self, amenity_id: AmenityId) -> StoreResult<Option<Amenity>> {
        Ok(self.lock()?.amenities.get(&amenity_id).cloned())
    }

    async fn update_amenity(&self, amenity: &Amenity) -> StoreResult<Amenity> {
        let mut tables = self.lock()?;
        let stored = tables
            .amenities
            .get_mut(&amenity.id)
            .ok_or(StoreError::NotFound)?;
        *stored = amenity.clone();
        Ok(stored.clone())
    }

    async fn list_amenities(&self, community_id: Option<CommunityId>) -> StoreResult<Vec<Amenity>> {
        let tables = self.lock()?;
        let mut amenities: Vec<Amenity> = tables
            .amenities
            .values()
            .filter(|a| community_id.is_none() || a.community_id == community_id)
            .cloned()
            .collect();
        amenities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(amenities)
    }
}

impl ReservationRepository for InMemoryStore {
    async fn insert_reservation(&self, reservation: &Reservation) -> StoreResult<Reservation> {
        let mut tables = self.lock()?;
        tables.check(FailPoint::InsertReservation)?;

        let key = reservation.slot_key();
        let taken = tables
            .reservations
            .values()
            .any(|r| r.status.holds_slot() && r.slot_key() == key);
        if taken {
            return Err(StoreError::UniqueViolation {
                constraint: SLOT_CONSTRAINT.to_string(),
            });
        }

        tables.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation.clone())
    }

    async fn get_reservation(&self, reservation_id: ReservationId) -> StoreResult<Option<Reservation>> {
        Ok(self.lock()?.reservations.get(&reservation_id).cloned())
    }

    async fn cancel_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> StoreResult<Option<Reservation>> {
        let mut tables = self.lock()?;
        Ok(tables
            .reservations
            .get_mut(&reservation_id)
            .filter(|r| r.status == ReservationStatus::Active)
            .map(|r| {
                r.status = ReservationStatus::Cancelled;
                r.clone()
            }))
    }

    async fn grade_reservation(
        &self,
        reservation_id: ReservationId,
        outcome: GradeOutcome,
    ) -> StoreResult<Option<Reservation>> {
        let mut tables = self.lock()?;
        Ok(tables
            .reservations
            .get_mut(&reservation_id)
            .filter(|r| r.status == ReservationStatus::Active && r.grade == Grade::Pending)
            .map(|r| {
                r.status = ReservationStatus::Finalized;
                r.grade = outcome.grade();
                r.compliance_pct = outcome.compliance_pct();
                r.clone()
            }))
    }

    async fn list_user_reservations(&self, user_id: UserId) -> StoreResult<Vec<Reservation>> {
        let tables = self.lock()?;
        let mut reservations: Vec<Reservation> = tables
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        reservations.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.time_slot.cmp(&a.time_slot))
        });
        Ok(reservations)
    }

    async fn list_amenity_reservations(
        &self,
        amenity_id: AmenityId,
        date: NaiveDate,
    ) -> StoreResult<Vec<Reservation>> {
        let tables = self.lock()?;
        let mut reservations: Vec<Reservation> = tables
            .reservations
            .values()
            .filter(|r| r.amenity_id == amenity_id && r.date == date)
            .filter(|r| r.status != ReservationStatus::Cancelled)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.time_slot);
        Ok(reservations)
    }

    async fn latest_active_in_category(
        &self,
        user_id: UserId,
        category: AmenityCategory,
    ) -> StoreResult<Option<Reservation>> {
        let tables = self.lock()?;
        Ok(tables
            .reservations
            .values()
            .filter(|r| r.user_id == user_id && r.status == ReservationStatus::Active)
            .filter(|r| {
                tables
                    .amenities
                    .get(&r.amenity_id)
                    .is_some_and(|a| a.category == category)
            })
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn audit_reservations(
        &self,
        community_id: Option<CommunityId>,
    ) -> StoreResult<Vec<AuditEntry>> {
        let tables = self.lock()?;
        let mut entries: Vec<AuditEntry> = tables
            .reservations
            .values()
            .filter_map(|r| {
                let amenity = tables.amenities.get(&r.amenity_id)?;
                let user = tables.users.get(&r.user_id)?;
                Some(AuditEntry {
                    reservation: r.clone(),
                    amenity_name: amenity.name.clone(),
                    amenity_community_id: amenity.community_id,
                    user_name: user.name.clone(),
                    user_email: user.email.clone(),
                    user_community_id: user.community_id,
                })
            })
            .filter(|entry| {
                community_id.is_none()
                    || entry.amenity_community_id == community_id
                    || entry.user_community_id == community_id
            })
            .collect();
        entries.sort_by(|a, b| {
            b.reservation
                .date
                .cmp(&a.reservation.date)
                .then_with(|| b.reservation.time_slot.cmp(&a.reservation.time_slot))
        });
        Ok(entries)
    }
}

impl PointLedger for InMemoryStore {
    async fn append_point_log(&self, entry: &PointLog) -> StoreResult<PointLog> {
        let mut tables = self.lock()?;
        tables.check(FailPoint::AppendPointLog)?;
        tables.point_logs.push(entry.clone());
        Ok(entry.clone())
    }

    async fn list_user_point_logs(&self, user_id: UserId) -> StoreResult<Vec<PointLog>> {
        let tables = self.lock()?;
        // Newest first; ties keep reverse insertion order.
        let mut logs: Vec<PointLog> = tables
            .point_logs
            .iter()
            .rev()
            .filter(|log| log.user_id == user_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(logs)
    }

    async fn sum_user_points(&self, user_id: UserId) -> StoreResult<i64> {
        Ok(self
            .lock()?
            .point_logs
            .iter()
            .filter(|log| log.user_id == user_id)
            .map(|log| log.points)
            .sum())
    }

    async fn sum_community_points(&self, community_id: CommunityId) -> StoreResult<i64> {
        Ok(self
            .lock()?
            .point_logs
            .iter()
            .filter(|log| log.community_id == Some(community_id))
            .map(|log| log.points)
            .sum())
    }
}

impl JoinRequestRepository for InMemoryStore {
    async fn insert_join_request(&self, request: &JoinRequest) -> StoreResult<JoinRequest> {
        self.lock()?
            .join_requests
            .insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn get_join_request(&self, request_id: JoinRequestId) -> StoreResult<Option<JoinRequest>> {
        Ok(self.lock()?.join_requests.get(&request_id).cloned())
    }

    async fn decide_join_request(
        &self,
        request_id: JoinRequestId,
        decision: JoinRequestStatus,
    ) -> StoreResult<Option<JoinRequest>> {
        let mut tables = self.lock()?;
        tables.check(FailPoint::DecideJoinRequest)?;
        Ok(tables
            .join_requests
            .get_mut(&request_id)
            .filter(|r| r.status == JoinRequestStatus::Pending)
            .map(|r| {
                r.status = decision;
                r.clone()
            }))
    }

    async fn list_pending_join_requests(
        &self,
        community_id: CommunityId,
    ) -> StoreResult<Vec<JoinRequest>> {
        let tables = self.lock()?;
        let mut pending: Vec<JoinRequest> = tables
            .join_requests
            .values()
            .filter(|r| r.community_id == community_id && r.status == JoinRequestStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }
}

impl FeedRepository for InMemoryStore {
    async fn insert_post(&self, post: &Post) -> StoreResult<Post> {
        self.lock()?.posts.insert(post.id, post.clone());
        Ok(post.clone())
    }

    async fn get_post(&self, post_id: PostId) -> StoreResult<Option<Post>> {
        Ok(self.lock()?.posts.get(&post_id).cloned())
    }

    async fn list_community_posts(&self, community_id: CommunityId) -> StoreResult<Vec<Post>> {
        let tables = self.lock()?;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| p.community_id == community_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn count_posts(&self, community_id: Option<CommunityId>) -> StoreResult<u64> {
        let tables = self.lock()?;
        let count = tables
            .posts
            .values()
            .filter(|p| community_id.is_none_or(|c| p.community_id == c))
            .count();
        Ok(count as u64)
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<Comment> {
        self.lock()?.comments.push(comment.clone());
        Ok(comment.clone())
    }

    async fn list_post_comments(&self, post_id: PostId) -> StoreResult<Vec<Comment>> {
        let tables = self.lock()?;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn insert_like(&self, post_id: PostId, user_id: UserId) -> StoreResult<i64> {
        let mut tables = self.lock()?;
        if !tables.posts.contains_key(&post_id) {
            return Err(StoreError::NotFound);
        }
        if !tables.likes.insert((post_id, user_id)) {
            return Err(StoreError::UniqueViolation {
                constraint: LIKE_CONSTRAINT.to_string(),
            });
        }
        let post = tables.posts.get_mut(&post_id).ok_or(StoreError::NotFound)?;
        post.likes_count += 1;
        Ok(post.likes_count)
    }

    async fn delete_like(&self, post_id: PostId, user_id: UserId) -> StoreResult<Option<i64>> {
        let mut tables = self.lock()?;
        if !tables.likes.remove(&(post_id, user_id)) {
            return Ok(None);
        }
        Ok(tables.posts.get_mut(&post_id).map(|post| {
            post.likes_count = (post.likes_count - 1).max(0);
            post.likes_count
        }))
    }

    async fn liked_post_ids(&self, user_id: UserId) -> StoreResult<Vec<PostId>> {
        Ok(self
            .lock()?
            .likes
            .iter()
            .filter(|(_, liker)| *liker == user_id)
            .map(|(post_id, _)| *post_id)
            .collect())
    }

    async fn claim_like_reward(&self, post_id: PostId, user_id: UserId) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        tables.check(FailPoint::ClaimLikeReward)?;
        Ok(tables.like_rewards.insert((post_id, user_id)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_clock;
    use roomly_core::environment::Clock;

    #[tokio::test]
    async fn test_point_totals_refuse_to_overflow() {
        let store = InMemoryStore::new();
        let now = test_clock().now();
        let community = store
            .insert_community(&Community::new("Torre", "a@example.com", now))
            .await
            .unwrap();
        let user = store
            .insert_user(&User::new("ana@example.com", "Ana", now))
            .await
            .unwrap();
        store.set_user_points(user.id, i64::MAX - 1).await.unwrap();
        store.set_community_points(community.id, i64::MAX).await.unwrap();

        assert_eq!(store.add_user_points(user.id, 1).await.unwrap(), Some(i64::MAX));
        assert!(matches!(
            store.add_user_points(user.id, 1).await,
            Err(StoreError::Backend(_))
        ));
        assert!(matches!(
            store.add_community_points(community.id, 1).await,
            Err(StoreError::Backend(_))
        ));

        let user = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.points, i64::MAX);
        assert_eq!(store.add_user_points(UserId::new(), 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_like_reward_is_claimed_once() {
        let store = InMemoryStore::new();
        let (post_id, user_id) = (PostId::new(), UserId::new());

        assert!(store.claim_like_reward(post_id, user_id).await.unwrap());
        assert!(!store.claim_like_reward(post_id, user_id).await.unwrap());
        assert!(store.claim_like_reward(post_id, UserId::new()).await.unwrap());

        store.fail_on(FailPoint::ClaimLikeReward);
        assert!(store.claim_like_reward(PostId::new(), user_id).await.is_err());
    }
}
