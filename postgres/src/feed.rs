use crate::rows::{COMMENT_COLUMNS, CommentRow, POST_COLUMNS, PostRow, convert_all};
use crate::{PostgresStore, store_error};
use roomly_core::error::{StoreError, StoreResult};
use roomly_core::repository::FeedRepository;
use roomly_core::types::{Comment, CommunityId, Post, PostId, UserId};
use uuid::Uuid;

impl FeedRepository for PostgresStore {
    #[tracing::instrument(skip(self, post), fields(post_id = %post.id, community_id = %post.community_id))]
    async fn insert_post(&self, post: &Post) -> StoreResult<Post> {
        let row: PostRow = sqlx::query_as(&format!(
            "INSERT INTO posts ({POST_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(post.id.as_uuid())
        .bind(post.user_id.as_uuid())
        .bind(post.community_id.as_uuid())
        .bind(&post.text)
        .bind(&post.image_url)
        .bind(post.post_type.as_str())
        .bind(post.likes_count)
        .bind(post.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("insert post"))?;

        row.try_into()
    }

    async fn get_post(&self, post_id: PostId) -> StoreResult<Option<Post>> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
                .bind(post_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error("get post"))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_community_posts(&self, community_id: CommunityId) -> StoreResult<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE community_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(community_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list community posts"))?;

        convert_all(rows)
    }

    async fn count_posts(&self, community_id: Option<CommunityId>) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE $1::uuid IS NULL OR community_id = $1",
        )
        .bind(community_id.map(|c| *c.as_uuid()))
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("count posts"))?;

        u64::try_from(count).map_err(|_| StoreError::Backend(format!("Negative post count {count}")))
    }

    #[tracing::instrument(skip(self, comment), fields(post_id = %comment.post_id))]
    async fn insert_comment(&self, comment: &Comment) -> StoreResult<Comment> {
        let row: CommentRow = sqlx::query_as(&format!(
            "INSERT INTO comments ({COMMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(comment.id.as_uuid())
        .bind(comment.post_id.as_uuid())
        .bind(comment.user_id.as_uuid())
        .bind(&comment.text)
        .bind(comment.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("insert comment"))?;

        Ok(row.into())
    }

    async fn list_post_comments(&self, post_id: PostId) -> StoreResult<Vec<Comment>> {
        let rows: Vec<CommentRow> = sqlx::query_as(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE post_id = $1 \
             ORDER BY created_at ASC"
        ))
        .bind(post_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list comments"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The like row and the counter move together in one transaction.
    #[tracing::instrument(skip(self))]
    async fn insert_like(&self, post_id: PostId, user_id: UserId) -> StoreResult<i64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_error("begin transaction"))?;

        sqlx::query("INSERT INTO likes (post_id, user_id) VALUES ($1, $2)")
            .bind(post_id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(store_error("insert like"))?;

        let count: i64 = sqlx::query_scalar(
            "UPDATE posts SET likes_count = likes_count + 1 WHERE id = $1 RETURNING likes_count",
        )
        .bind(post_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(store_error("bump like count"))?;

        tx.commit().await.map_err(store_error("commit like"))?;
        Ok(count)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_like(&self, post_id: PostId, user_id: UserId) -> StoreResult<Option<i64>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_error("begin transaction"))?;

        let deleted = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(store_error("delete like"))?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await.map_err(store_error("roll back unlike"))?;
            return Ok(None);
        }

        let count: Option<i64> = sqlx::query_scalar(
            "UPDATE posts SET likes_count = GREATEST(likes_count - 1, 0) \
             WHERE id = $1 RETURNING likes_count",
        )
        .bind(post_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_error("drop like count"))?;

        tx.commit().await.map_err(store_error("commit unlike"))?;
        Ok(count)
    }

    async fn liked_post_ids(&self, user_id: UserId) -> StoreResult<Vec<PostId>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT post_id FROM likes WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list liked posts"))?;

        Ok(ids.into_iter().map(PostId::from_uuid).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn claim_like_reward(&self, post_id: PostId, user_id: UserId) -> StoreResult<bool> {
        let claimed = sqlx::query(
            "INSERT INTO like_rewards (post_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (post_id, user_id) DO NOTHING",
        )
        .bind(post_id.as_uuid())
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(store_error("claim like reward"))?;

        Ok(claimed.rows_affected() == 1)
    }
}
