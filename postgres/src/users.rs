use crate::rows::{USER_COLUMNS, UserRow, convert_all};
use crate::{PostgresStore, store_error};
use roomly_core::error::{StoreError, StoreResult};
use roomly_core::repository::UserRepository;
use roomly_core::types::{CommunityId, User, UserId, UserStatus};

impl UserRepository for PostgresStore {
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert_user(&self, user: &User) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id.as_uuid())
        .bind(&user.auth_id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.community_id.map(|c| *c.as_uuid()))
        .bind(&user.tower)
        .bind(&user.apartment)
        .bind(&user.avatar_url)
        .bind(user.points)
        .bind(user.status.as_str())
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("insert user"))?;

        row.try_into()
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error("get user"))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error("find user by email"))?;

        row.map(TryInto::try_into).transpose()
    }

    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET auth_id = $2, email = $3, name = $4, role = $5, \
             community_id = $6, tower = $7, apartment = $8, avatar_url = $9, status = $10 \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id.as_uuid())
        .bind(&user.auth_id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.community_id.map(|c| *c.as_uuid()))
        .bind(&user.tower)
        .bind(&user.apartment)
        .bind(&user.avatar_url)
        .bind(user.status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("update user"))?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    #[tracing::instrument(skip(self))]
    async fn set_user_status(&self, user_id: UserId, status: UserStatus) -> StoreResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET status = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("set user status"))?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    #[tracing::instrument(skip(self))]
    async fn add_user_points(&self, user_id: UserId, delta: i64) -> StoreResult<Option<i64>> {
        sqlx::query_scalar("UPDATE users SET points = points + $2 WHERE id = $1 RETURNING points")
            .bind(user_id.as_uuid())
            .bind(delta)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error("add user points"))
    }

    #[tracing::instrument(skip(self))]
    async fn set_user_points(&self, user_id: UserId, total: i64) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET points = $2 WHERE id = $1")
            .bind(user_id.as_uuid())
            .bind(total)
            .execute(&self.pool)
            .await
            .map_err(store_error("set user points"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_community_members(
        &self,
        community_id: CommunityId,
        active_only: bool,
    ) -> StoreResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE community_id = $1 AND (NOT $2 OR status = 'ACTIVE') \
             ORDER BY points DESC, name ASC"
        ))
        .bind(community_id.as_uuid())
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list community members"))?;

        convert_all(rows)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list users"))?;

        convert_all(rows)
    }
}
