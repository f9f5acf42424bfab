use crate::rows::{COMMUNITY_COLUMNS, CommunityRow, convert_all, to_i32};
use crate::{PostgresStore, store_error};
use roomly_core::error::StoreResult;
use roomly_core::repository::CommunityRepository;
use roomly_core::types::{Community, CommunityId};

impl CommunityRepository for PostgresStore {
    #[tracing::instrument(skip(self, community), fields(community_id = %community.id))]
    async fn insert_community(&self, community: &Community) -> StoreResult<Community> {
        let row: CommunityRow = sqlx::query_as(&format!(
            "INSERT INTO communities ({COMMUNITY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COMMUNITY_COLUMNS}"
        ))
        .bind(community.id.as_uuid())
        .bind(&community.name)
        .bind(&community.address)
        .bind(&community.admin_email)
        .bind(to_i32("total_floors", community.total_floors)?)
        .bind(to_i32("units_per_floor", community.units_per_floor)?)
        .bind(to_i32("num_buildings", community.num_buildings)?)
        .bind(to_i32("rooms_per_floor", community.rooms_per_floor)?)
        .bind(community.total_points)
        .bind(community.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("insert community"))?;

        row.try_into()
    }

    async fn get_community(&self, community_id: CommunityId) -> StoreResult<Option<Community>> {
        let row: Option<CommunityRow> = sqlx::query_as(&format!(
            "SELECT {COMMUNITY_COLUMNS} FROM communities WHERE id = $1"
        ))
        .bind(community_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("get community"))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_communities(&self) -> StoreResult<Vec<Community>> {
        let rows: Vec<CommunityRow> = sqlx::query_as(&format!(
            "SELECT {COMMUNITY_COLUMNS} FROM communities ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list communities"))?;

        convert_all(rows)
    }

    #[tracing::instrument(skip(self))]
    async fn add_community_points(
        &self,
        community_id: CommunityId,
        delta: i64,
    ) -> StoreResult<Option<i64>> {
        sqlx::query_scalar(
            "UPDATE communities SET total_points = total_points + $2 \
             WHERE id = $1 RETURNING total_points",
        )
        .bind(community_id.as_uuid())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("add community points"))
    }

    #[tracing::instrument(skip(self))]
    async fn set_community_points(&self, community_id: CommunityId, total: i64) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE communities SET total_points = $2 WHERE id = $1")
            .bind(community_id.as_uuid())
            .bind(total)
            .execute(&self.pool)
            .await
            .map_err(store_error("set community points"))?;

        Ok(result.rows_affected() > 0)
    }
}
