//! Repository traits - the data-store and object-storage collaborators.
//!
//! The engine is generic over these traits. Implementations live in
//! `roomly-postgres` (production) and `roomly-testing` (in-memory).
//!
//! # Concurrency contract
//!
//! Two guarantees must come from the store itself, never from a
//! read-then-write in the caller:
//!
//! - [`ReservationRepository::insert_reservation`] fails with
//!   [`StoreError::UniqueViolation`] naming [`SLOT_CONSTRAINT`] when another
//!   `ACTIVE` or `FINALIZED` reservation holds the same [`SlotKey`].
//! - State transitions (`cancel_reservation`, `grade_reservation`,
//!   `decide_join_request`) are conditional writes: they only apply when the
//!   row is still in the expected source state, and return `None` otherwise.
//!
//! Point totals are incremented atomically by the store; a lost update is not
//! possible, but the three writes of an award are still independent.
//!
//! [`StoreError::UniqueViolation`]: crate::error::StoreError::UniqueViolation
//! [`SLOT_CONSTRAINT`]: crate::error::SLOT_CONSTRAINT
//! [`SlotKey`]: crate::types::SlotKey

use crate::error::StoreResult;
use crate::types::{
    Amenity, AmenityCategory, AmenityId, AuditEntry, Comment, Community, CommunityId,
    GradeOutcome, JoinRequest, JoinRequestId, JoinRequestStatus, PointLog, Post, PostId,
    Reservation, ReservationId, User, UserId, UserStatus,
};
use chrono::NaiveDate;
use std::future::Future;

/// User profiles and their cached point totals.
pub trait UserRepository: Send + Sync {
    /// Insert a new profile.
    ///
    /// # Errors
    ///
    /// `UniqueViolation` if the e-mail is taken, `Backend` on store failure.
    fn insert_user(&self, user: &User) -> impl Future<Output = StoreResult<User>> + Send;

    /// Fetch a profile by ID.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn get_user(&self, user_id: UserId) -> impl Future<Output = StoreResult<Option<User>>> + Send;

    /// Fetch a profile by e-mail.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = StoreResult<Option<User>>> + Send;

    /// Replace a profile's mutable fields (everything except `points` and `created_at`).
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not exist, `Backend` on store failure.
    fn update_user(&self, user: &User) -> impl Future<Output = StoreResult<User>> + Send;

    /// Change a profile's status.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not exist, `Backend` on store failure.
    fn set_user_status(
        &self,
        user_id: UserId,
        status: UserStatus,
    ) -> impl Future<Output = StoreResult<User>> + Send;

    /// Atomically add `delta` to the cached total. Returns the new total, or
    /// `None` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn add_user_points(
        &self,
        user_id: UserId,
        delta: i64,
    ) -> impl Future<Output = StoreResult<Option<i64>>> + Send;

    /// Overwrite the cached total (reconciliation). Returns `false` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn set_user_points(
        &self,
        user_id: UserId,
        total: i64,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Members of a community ordered by points, highest first.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn list_community_members(
        &self,
        community_id: CommunityId,
        active_only: bool,
    ) -> impl Future<Output = StoreResult<Vec<User>>> + Send;

    /// Every profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn list_users(&self) -> impl Future<Output = StoreResult<Vec<User>>> + Send;
}

/// Communities and their cached point totals.
pub trait CommunityRepository: Send + Sync {
    /// Insert a new community.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn insert_community(
        &self,
        community: &Community,
    ) -> impl Future<Output = StoreResult<Community>> + Send;

    /// Fetch a community by ID.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn get_community(
        &self,
        community_id: CommunityId,
    ) -> impl Future<Output = StoreResult<Option<Community>>> + Send;

    /// Every community ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn list_communities(&self) -> impl Future<Output = StoreResult<Vec<Community>>> + Send;

    /// Atomically add `delta` to the cached total. Returns the new total, or
    /// `None` if the community does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn add_community_points(
        &self,
        community_id: CommunityId,
        delta: i64,
    ) -> impl Future<Output = StoreResult<Option<i64>>> + Send;

    /// Overwrite the cached total (reconciliation). Returns `false` if the community does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn set_community_points(
        &self,
        community_id: CommunityId,
        total: i64,
    ) -> impl Future<Output = StoreResult<bool>> + Send;
}

/// Amenity reference data.
pub trait AmenityRepository: Send + Sync {
    /// Insert a new amenity.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn insert_amenity(&self, amenity: &Amenity)
    -> impl Future<Output = StoreResult<Amenity>> + Send;

    /// Fetch an amenity by ID.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn get_amenity(
        &self,
        amenity_id: AmenityId,
    ) -> impl Future<Output = StoreResult<Option<Amenity>>> + Send;

    /// Replace an amenity's fields.
    ///
    /// # Errors
    ///
    /// `NotFound` if the amenity does not exist, `Backend` on store failure.
    fn update_amenity(&self, amenity: &Amenity)
    -> impl Future<Output = StoreResult<Amenity>> + Send;

    /// Amenities ordered by name, optionally restricted to one community.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn list_amenities(
        &self,
        community_id: Option<CommunityId>,
    ) -> impl Future<Output = StoreResult<Vec<Amenity>>> + Send;
}

/// Reservations, keyed for slot exclusivity.
pub trait ReservationRepository: Send + Sync {
    /// Insert a reservation.
    ///
    /// # Errors
    ///
    /// `UniqueViolation` naming `SLOT_CONSTRAINT` if the slot is held,
    /// `Backend` on store failure.
    fn insert_reservation(
        &self,
        reservation: &Reservation,
    ) -> impl Future<Output = StoreResult<Reservation>> + Send;

    /// Fetch a reservation by ID.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn get_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> impl Future<Output = StoreResult<Option<Reservation>>> + Send;

    /// `ACTIVE` → `CANCELLED`. Returns `None` if the reservation is missing or not active.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn cancel_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> impl Future<Output = StoreResult<Option<Reservation>>> + Send;

    /// `ACTIVE`/`PENDING` → `FINALIZED`/outcome. Returns `None` if the
    /// reservation is missing, not active, or already graded.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn grade_reservation(
        &self,
        reservation_id: ReservationId,
        outcome: GradeOutcome,
    ) -> impl Future<Output = StoreResult<Option<Reservation>>> + Send;

    /// A user's reservations ordered by date, latest first.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn list_user_reservations(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = StoreResult<Vec<Reservation>>> + Send;

    /// Non-cancelled reservations of an amenity on a day, ordered by slot.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn list_amenity_reservations(
        &self,
        amenity_id: AmenityId,
        date: NaiveDate,
    ) -> impl Future<Output = StoreResult<Vec<Reservation>>> + Send;

    /// The user's most recently created `ACTIVE` reservation of any amenity in `category`.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn latest_active_in_category(
        &self,
        user_id: UserId,
        category: AmenityCategory,
    ) -> impl Future<Output = StoreResult<Option<Reservation>>> + Send;

    /// Reservations joined with amenity and user, latest date first. With a
    /// community, only rows whose amenity or user belongs to it.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn audit_reservations(
        &self,
        community_id: Option<CommunityId>,
    ) -> impl Future<Output = StoreResult<Vec<AuditEntry>>> + Send;
}

/// The append-only points ledger.
pub trait PointLedger: Send + Sync {
    /// Append an entry. Entries are never updated or deleted.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn append_point_log(&self, entry: &PointLog)
    -> impl Future<Output = StoreResult<PointLog>> + Send;

    /// A user's entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn list_user_point_logs(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = StoreResult<Vec<PointLog>>> + Send;

    /// Sum of a user's entries.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn sum_user_points(&self, user_id: UserId) -> impl Future<Output = StoreResult<i64>> + Send;

    /// Sum of the entries credited to a community.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn sum_community_points(
        &self,
        community_id: CommunityId,
    ) -> impl Future<Output = StoreResult<i64>> + Send;
}

/// Join requests.
pub trait JoinRequestRepository: Send + Sync {
    /// Insert a new request.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn insert_join_request(
        &self,
        request: &JoinRequest,
    ) -> impl Future<Output = StoreResult<JoinRequest>> + Send;

    /// Fetch a request by ID.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn get_join_request(
        &self,
        request_id: JoinRequestId,
    ) -> impl Future<Output = StoreResult<Option<JoinRequest>>> + Send;

    /// `PENDING` → `decision`. Returns `None` if the request is missing or already decided.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn decide_join_request(
        &self,
        request_id: JoinRequestId,
        decision: JoinRequestStatus,
    ) -> impl Future<Output = StoreResult<Option<JoinRequest>>> + Send;

    /// Pending requests for a community, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn list_pending_join_requests(
        &self,
        community_id: CommunityId,
    ) -> impl Future<Output = StoreResult<Vec<JoinRequest>>> + Send;
}

/// Posts, comments and likes.
pub trait FeedRepository: Send + Sync {
    /// Insert a post.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn insert_post(&self, post: &Post) -> impl Future<Output = StoreResult<Post>> + Send;

    /// Fetch a post by ID.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn get_post(&self, post_id: PostId) -> impl Future<Output = StoreResult<Option<Post>>> + Send;

    /// A community's posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn list_community_posts(
        &self,
        community_id: CommunityId,
    ) -> impl Future<Output = StoreResult<Vec<Post>>> + Send;

    /// Number of posts, optionally restricted to one community.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn count_posts(
        &self,
        community_id: Option<CommunityId>,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Insert a comment.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn insert_comment(&self, comment: &Comment)
    -> impl Future<Output = StoreResult<Comment>> + Send;

    /// A post's comments, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn list_post_comments(
        &self,
        post_id: PostId,
    ) -> impl Future<Output = StoreResult<Vec<Comment>>> + Send;

    /// Record a like and bump the post's counter. Returns the new count.
    ///
    /// # Errors
    ///
    /// `UniqueViolation` naming `LIKE_CONSTRAINT` on a duplicate like,
    /// `NotFound` if the post does not exist, `Backend` on store failure.
    fn insert_like(
        &self,
        post_id: PostId,
        user_id: UserId,
    ) -> impl Future<Output = StoreResult<i64>> + Send;

    /// Remove a like and decrement the counter (never below zero). Returns
    /// the new count, or `None` if there was no such like.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn delete_like(
        &self,
        post_id: PostId,
        user_id: UserId,
    ) -> impl Future<Output = StoreResult<Option<i64>>> + Send;

    /// IDs of the posts a user has liked.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn liked_post_ids(&self, user_id: UserId)
    -> impl Future<Output = StoreResult<Vec<PostId>>> + Send;

    /// Mark the author's reward for `user_id` liking `post_id` as paid.
    /// Returns `false` if it was already paid; unliking never clears it.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on store failure.
    fn claim_like_reward(
        &self,
        post_id: PostId,
        user_id: UserId,
    ) -> impl Future<Output = StoreResult<bool>> + Send;
}

/// Binary upload collaborator.
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `path` (overwriting) and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on upload failure.
    fn upload(&self, path: &str, bytes: Vec<u8>) -> impl Future<Output = StoreResult<String>> + Send;
}

/// Everything the engine needs from the data store.
pub trait DataStore:
    UserRepository
    + CommunityRepository
    + AmenityRepository
    + ReservationRepository
    + PointLedger
    + JoinRequestRepository
    + FeedRepository
    + Clone
    + 'static
{
}

impl<T> DataStore for T where
    T: UserRepository
        + CommunityRepository
        + AmenityRepository
        + ReservationRepository
        + PointLedger
        + JoinRequestRepository
        + FeedRepository
        + Clone
        + 'static
{
}
