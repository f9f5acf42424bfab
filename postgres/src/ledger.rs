use crate::rows::{POINT_LOG_COLUMNS, PointLogRow};
use crate::{PostgresStore, store_error};
use roomly_core::error::StoreResult;
use roomly_core::repository::PointLedger;
use roomly_core::types::{CommunityId, PointLog, UserId};

impl PointLedger for PostgresStore {
    #[tracing::instrument(
        skip(self, entry),
        fields(user_id = %entry.user_id, action = %entry.action, points = entry.points)
    )]
    async fn append_point_log(&self, entry: &PointLog) -> StoreResult<PointLog> {
        let row: PointLogRow = sqlx::query_as(&format!(
            "INSERT INTO point_logs ({POINT_LOG_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {POINT_LOG_COLUMNS}"
        ))
        .bind(entry.id.as_uuid())
        .bind(entry.user_id.as_uuid())
        .bind(entry.community_id.map(|c| *c.as_uuid()))
        .bind(&entry.action)
        .bind(entry.points)
        .bind(&entry.description)
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("append point log"))?;

        Ok(row.into())
    }

    async fn list_user_point_logs(&self, user_id: UserId) -> StoreResult<Vec<PointLog>> {
        let rows: Vec<PointLogRow> = sqlx::query_as(&format!(
            "SELECT {POINT_LOG_COLUMNS} FROM point_logs \
             WHERE user_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list point logs"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn sum_user_points(&self, user_id: UserId) -> StoreResult<i64> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(points), 0)::BIGINT FROM point_logs WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("sum user points"))
    }

    async fn sum_community_points(&self, community_id: CommunityId) -> StoreResult<i64> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(points), 0)::BIGINT FROM point_logs WHERE community_id = $1",
        )
        .bind(community_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("sum community points"))
    }
}
