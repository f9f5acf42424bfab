//! Community feed: posts, comments and likes, each a source of points.

use crate::access::{load_user, require_text};
use crate::metrics;
use crate::points::{PointsCoordinator, PointsStatus, Rewarded};
use roomly_core::environment::Clock;
use roomly_core::error::{LIKE_CONSTRAINT, Result, RoomlyError, StoreError};
use roomly_core::points::{AwardReason, PointAction};
use roomly_core::repository::{DataStore, ObjectStorage};
use roomly_core::types::{
    Comment, CommentId, CommunityId, Post, PostId, PostType, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A file to attach, uploaded to object storage before the record is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Original file name (used as the last path segment)
    pub file_name: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Object path under `prefix`, with the file name reduced to safe characters.
    pub(crate) fn path(&self, prefix: &str) -> String {
        let name: String = self
            .file_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{prefix}/{name}")
    }
}

/// Input for [`Feed::create_post`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPost {
    /// Body
    pub text: String,
    /// Post type
    #[serde(default = "default_post_type")]
    pub post_type: PostType,
}

const fn default_post_type() -> PostType {
    PostType::General
}

/// A post with its comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    /// The post
    pub post: Post,
    /// Comments, oldest first
    pub comments: Vec<Comment>,
}

/// Points earned for publishing a post of `post_type`.
#[must_use]
pub const fn post_action(post_type: PostType) -> PointAction {
    match post_type {
        PostType::General => PointAction::Comment,
        PostType::AreaPhoto => PointAction::UploadAreaPhoto,
        PostType::BugReport => PointAction::BugReport,
    }
}

/// Posts, comments and likes.
pub struct Feed<S, O> {
    store: S,
    storage: O,
    points: Arc<PointsCoordinator<S>>,
    clock: Arc<dyn Clock>,
}

impl<S: DataStore, O: ObjectStorage> Feed<S, O> {
    /// Create a new feed
    pub fn new(
        store: S,
        storage: O,
        points: Arc<PointsCoordinator<S>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            storage,
            points,
            clock,
        }
    }

    /// Publish a post to the author's community feed.
    ///
    /// The optional image is uploaded first; the post earns points by type.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank post or an author without a community,
    /// `NotFound` for an unknown author, `Store` on store or upload failure.
    pub async fn create_post(
        &self,
        author: UserId,
        post: NewPost,
        image: Option<Upload>,
    ) -> Result<Rewarded<Post>> {
        if image.is_none() {
            require_text("Post text", &post.text)?;
        }
        let user = load_user(&self.store, author).await?;
        let community_id = user.community_id.ok_or_else(|| {
            RoomlyError::Validation("Join a community before posting".into())
        })?;

        let id = PostId::new();
        let image_url = match image {
            Some(upload) => Some(
                self.storage
                    .upload(&upload.path(&format!("posts/{id}")), upload.bytes)
                    .await?,
            ),
            None => None,
        };

        let post = Post {
            id,
            user_id: author,
            community_id,
            text: post.text.trim().to_string(),
            image_url,
            post_type: post.post_type,
            likes_count: 0,
            created_at: self.clock.now(),
        };
        let post = self.store.insert_post(&post).await?;
        tracing::info!(post_id = %post.id, %author, post_type = %post.post_type, "Post published");

        let points = self
            .points
            .award_best_effort(&user, AwardReason::Action(post_action(post.post_type)), "post")
            .await;
        Ok(Rewarded {
            record: post,
            points,
        })
    }

    /// Comment on a post.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank comment, `NotFound` for an unknown post or
    /// author, `Store` on store failure.
    pub async fn add_comment(
        &self,
        author: UserId,
        post_id: PostId,
        text: &str,
    ) -> Result<Rewarded<Comment>> {
        require_text("Comment", text)?;
        let user = load_user(&self.store, author).await?;
        if self.store.get_post(post_id).await?.is_none() {
            return Err(RoomlyError::not_found("post", post_id));
        }

        let comment = Comment {
            id: CommentId::new(),
            post_id,
            user_id: author,
            text: text.trim().to_string(),
            created_at: self.clock.now(),
        };
        let comment = self.store.insert_comment(&comment).await?;
        tracing::info!(%post_id, %author, "Comment added");

        let points = self
            .points
            .award_best_effort(&user, AwardReason::Action(PointAction::Comment), "comment")
            .await;
        Ok(Rewarded {
            record: comment,
            points,
        })
    }

    /// Like a post.
    ///
    /// The author earns points the first time each other resident likes the
    /// post; unliking and liking again pays nothing. Returns the new like
    /// count. Reward bookkeeping never fails the like itself.
    ///
    /// # Errors
    ///
    /// `Conflict` if already liked, `NotFound` for an unknown post or user,
    /// `Store` on store failure.
    pub async fn like_post(&self, user_id: UserId, post_id: PostId) -> Result<Rewarded<i64>> {
        load_user(&self.store, user_id).await?;
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or_else(|| RoomlyError::not_found("post", post_id))?;

        let likes = match self.store.insert_like(post_id, user_id).await {
            Ok(count) => count,
            Err(e) if e.violates(LIKE_CONSTRAINT) => {
                return Err(RoomlyError::Conflict("You already liked this post".into()));
            }
            Err(StoreError::NotFound) => return Err(RoomlyError::not_found("post", post_id)),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(%post_id, %user_id, likes, "Post liked");

        let points = if post.user_id == user_id {
            PointsStatus::NotEligible
        } else {
            self.reward_like(&post, user_id).await
        };

        Ok(Rewarded {
            record: likes,
            points,
        })
    }

    async fn reward_like(&self, post: &Post, liker: UserId) -> PointsStatus {
        let claimed = match self.store.claim_like_reward(post.id, liker).await {
            Ok(claimed) => claimed,
            Err(e) => return like_reward_failed(post, &e.to_string()),
        };
        if !claimed {
            tracing::debug!(post_id = %post.id, %liker, "Like reward already paid");
            return PointsStatus::NotEligible;
        }

        match load_user(&self.store, post.user_id).await {
            Ok(author) => {
                let reason = AwardReason::Action(PointAction::LikeReceived);
                self.points.award_best_effort(&author, reason, "like").await
            }
            Err(e) => like_reward_failed(post, &e.to_string()),
        }
    }

    /// Remove a like. Points already earned by the author are kept.
    ///
    /// Returns the new like count.
    ///
    /// # Errors
    ///
    /// `State` if the post was not liked, `Store` on store failure.
    pub async fn unlike_post(&self, user_id: UserId, post_id: PostId) -> Result<i64> {
        let likes = self
            .store
            .delete_like(post_id, user_id)
            .await?
            .ok_or_else(|| RoomlyError::State("Post is not liked".into()))?;
        tracing::debug!(%post_id, %user_id, likes, "Post unliked");
        Ok(likes)
    }

    /// A community's posts with their comments, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Store` on store failure.
    pub async fn community_posts(&self, community_id: CommunityId) -> Result<Vec<FeedItem>> {
        let posts = self.store.list_community_posts(community_id).await?;
        let mut items = Vec::with_capacity(posts.len());
        for post in posts {
            let comments = self.store.list_post_comments(post.id).await?;
            items.push(FeedItem { post, comments });
        }
        Ok(items)
    }

    /// IDs of the posts a user has liked.
    ///
    /// # Errors
    ///
    /// Returns `Store` on store failure.
    pub async fn liked_post_ids(&self, user_id: UserId) -> Result<Vec<PostId>> {
        Ok(self.store.liked_post_ids(user_id).await?)
    }
}

fn like_reward_failed(post: &Post, reason: &str) -> PointsStatus {
    tracing::warn!(post_id = %post.id, author = %post.user_id, reason, "Like reward not paid");
    metrics::record_points_failure("like");
    PointsStatus::Failed {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use roomly_core::repository::{FeedRepository, PointLedger, UserRepository};
    use roomly_core::types::User;
    use roomly_testing::{FailPoint, Fixtures, InMemoryObjectStorage, InMemoryStore, test_clock};

    struct Harness {
        store: InMemoryStore,
        storage: InMemoryObjectStorage,
        feed: Feed<InMemoryStore, InMemoryObjectStorage>,
        fx: Fixtures,
    }

    async fn harness() -> Harness {
        let store = InMemoryStore::new();
        let storage = InMemoryObjectStorage::new();
        let fx = Fixtures::seed(&store, &test_clock()).await.unwrap();
        let clock: Arc<dyn Clock> = Arc::new(test_clock());
        let points = Arc::new(PointsCoordinator::new(store.clone(), Arc::clone(&clock)));
        let feed = Feed::new(store.clone(), storage.clone(), points, clock);
        Harness {
            store,
            storage,
            feed,
            fx,
        }
    }

    fn post(text: &str, post_type: PostType) -> NewPost {
        NewPost {
            text: text.to_string(),
            post_type,
        }
    }

    async fn points_of(store: &InMemoryStore, user_id: UserId) -> i64 {
        store.get_user(user_id).await.unwrap().unwrap().points
    }

    #[tokio::test]
    async fn test_post_types_award_by_schedule() {
        let h = harness().await;

        let general = h
            .feed
            .create_post(h.fx.alice.id, post("Hola vecinos", PostType::General), None)
            .await
            .unwrap();
        let bug = h
            .feed
            .create_post(h.fx.alice.id, post("Elevator B is stuck", PostType::BugReport), None)
            .await
            .unwrap();

        assert_eq!(general.points.points(), 5);
        assert_eq!(bug.points.points(), 25);
        assert_eq!(general.record.community_id, h.fx.community.id);
        assert_eq!(points_of(&h.store, h.fx.alice.id).await, 30);
    }

    #[tokio::test]
    async fn test_area_photo_is_uploaded() {
        let h = harness().await;
        let upload = Upload {
            file_name: "garden view.jpg".to_string(),
            bytes: vec![0xFF, 0xD8],
        };

        let created = h
            .feed
            .create_post(h.fx.bob.id, post("", PostType::AreaPhoto), Some(upload))
            .await
            .unwrap();

        let url = created.record.image_url.unwrap();
        assert!(url.ends_with("/garden_view.jpg"));
        assert_eq!(h.storage.len(), 1);
        assert_eq!(created.points.points(), 15);
    }

    #[tokio::test]
    async fn test_post_requires_text_and_community() {
        let h = harness().await;
        assert!(matches!(
            h.feed
                .create_post(h.fx.alice.id, post("   ", PostType::General), None)
                .await,
            Err(RoomlyError::Validation(_))
        ));

        let outsider = h
            .store
            .insert_user(&User::new("out@example.com", "Out", test_clock().now()))
            .await
            .unwrap();
        assert!(matches!(
            h.feed
                .create_post(outsider.id, post("hi", PostType::General), None)
                .await,
            Err(RoomlyError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_comment_awards_commenter() {
        let h = harness().await;
        let created = h
            .feed
            .create_post(h.fx.alice.id, post("Pool party?", PostType::General), None)
            .await
            .unwrap();

        let comment = h
            .feed
            .add_comment(h.fx.bob.id, created.record.id, "Count me in")
            .await
            .unwrap();

        assert_eq!(comment.points.points(), 5);
        assert_eq!(points_of(&h.store, h.fx.bob.id).await, 5);

        let items = h.feed.community_posts(h.fx.community.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].comments.len(), 1);
        assert_eq!(items[0].comments[0].text, "Count me in");
    }

    #[tokio::test]
    async fn test_likes_award_author_once() {
        let h = harness().await;
        let created = h
            .feed
            .create_post(h.fx.alice.id, post("New gym hours", PostType::General), None)
            .await
            .unwrap();
        let post_id = created.record.id;

        let liked = h.feed.like_post(h.fx.bob.id, post_id).await.unwrap();
        assert_eq!(liked.record, 1);
        assert_eq!(liked.points.points(), 2);
        assert_eq!(points_of(&h.store, h.fx.alice.id).await, 7);

        assert!(matches!(
            h.feed.like_post(h.fx.bob.id, post_id).await,
            Err(RoomlyError::Conflict(_))
        ));

        let own = h.feed.like_post(h.fx.alice.id, post_id).await.unwrap();
        assert_eq!(own.record, 2);
        assert_eq!(own.points, PointsStatus::NotEligible);
        assert_eq!(points_of(&h.store, h.fx.alice.id).await, 7);

        assert_eq!(h.feed.liked_post_ids(h.fx.bob.id).await.unwrap(), vec![post_id]);

        // Unlike keeps the author's points.
        assert_eq!(h.feed.unlike_post(h.fx.bob.id, post_id).await.unwrap(), 1);
        assert_eq!(points_of(&h.store, h.fx.alice.id).await, 7);
        assert!(matches!(
            h.feed.unlike_post(h.fx.bob.id, post_id).await,
            Err(RoomlyError::State(_))
        ));
    }

    #[tokio::test]
    async fn test_relike_cycles_pay_the_author_once() {
        let h = harness().await;
        let created = h
            .feed
            .create_post(h.fx.alice.id, post("Lobby plants", PostType::General), None)
            .await
            .unwrap();
        let post_id = created.record.id;
        let before = points_of(&h.store, h.fx.alice.id).await;

        let first = h.feed.like_post(h.fx.bob.id, post_id).await.unwrap();
        assert_eq!(first.points.points(), 2);
        h.feed.unlike_post(h.fx.bob.id, post_id).await.unwrap();

        for _ in 0..10 {
            let again = h.feed.like_post(h.fx.bob.id, post_id).await.unwrap();
            assert_eq!(again.record, 1);
            assert_eq!(again.points, PointsStatus::NotEligible);
            h.feed.unlike_post(h.fx.bob.id, post_id).await.unwrap();
        }

        assert_eq!(points_of(&h.store, h.fx.alice.id).await, before + 2);
        assert_eq!(h.store.sum_user_points(h.fx.alice.id).await.unwrap(), before + 2);
    }

    #[tokio::test]
    async fn test_like_kept_when_author_is_missing() {
        let h = harness().await;
        let orphan = h
            .store
            .insert_post(&Post {
                id: PostId::new(),
                user_id: UserId::new(),
                community_id: h.fx.community.id,
                text: "Left behind".to_string(),
                image_url: None,
                post_type: PostType::General,
                likes_count: 0,
                created_at: test_clock().now(),
            })
            .await
            .unwrap();

        let liked = h.feed.like_post(h.fx.bob.id, orphan.id).await.unwrap();
        assert_eq!(liked.record, 1);
        assert!(matches!(liked.points, PointsStatus::Failed { .. }));
        assert_eq!(h.feed.liked_post_ids(h.fx.bob.id).await.unwrap(), vec![orphan.id]);
    }

    #[tokio::test]
    async fn test_like_kept_when_reward_claim_fails() {
        let h = harness().await;
        let created = h
            .feed
            .create_post(h.fx.alice.id, post("Quiet hours", PostType::General), None)
            .await
            .unwrap();
        h.store.fail_on(FailPoint::ClaimLikeReward);

        let liked = h.feed.like_post(h.fx.bob.id, created.record.id).await.unwrap();
        assert_eq!(liked.record, 1);
        assert!(matches!(liked.points, PointsStatus::Failed { .. }));
        assert_eq!(points_of(&h.store, h.fx.alice.id).await, 5);
    }

    #[tokio::test]
    async fn test_like_unknown_post() {
        let h = harness().await;
        assert!(matches!(
            h.feed.like_post(h.fx.bob.id, PostId::new()).await,
            Err(RoomlyError::NotFound { entity: "post", .. })
        ));
    }

    #[test]
    fn test_upload_path_is_sanitized() {
        let upload = Upload {
            file_name: "../../etc/passwd".to_string(),
            bytes: vec![],
        };
        assert_eq!(upload.path("avatars/u1"), "avatars/u1/.._.._etc_passwd");
    }
}
