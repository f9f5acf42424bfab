use crate::rows::{AMENITY_COLUMNS, AmenityRow, convert_all, to_i32};
use crate::{PostgresStore, store_error};
use roomly_core::error::{StoreError, StoreResult};
use roomly_core::repository::AmenityRepository;
use roomly_core::types::{Amenity, AmenityId, CommunityId};

impl AmenityRepository for PostgresStore {
    #[tracing::instrument(skip(self, amenity), fields(amenity_id = %amenity.id))]
    async fn insert_amenity(&self, amenity: &Amenity) -> StoreResult<Amenity> {
        let row: AmenityRow = sqlx::query_as(&format!(
            "INSERT INTO amenities ({AMENITY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {AMENITY_COLUMNS}"
        ))
        .bind(amenity.id.as_uuid())
        .bind(amenity.community_id.map(|c| *c.as_uuid()))
        .bind(&amenity.name)
        .bind(to_i32("capacity", amenity.capacity)?)
        .bind(&amenity.description)
        .bind(&amenity.image_url)
        .bind(amenity.category.as_str())
        .bind(amenity.points_reward)
        .bind(amenity.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("insert amenity"))?;

        row.try_into()
    }

    async fn get_amenity(&self, amenity_id: AmenityId) -> StoreResult<Option<Amenity>> {
        let row: Option<AmenityRow> =
            sqlx::query_as(&format!("SELECT {AMENITY_COLUMNS} FROM amenities WHERE id = $1"))
                .bind(amenity_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error("get amenity"))?;

        row.map(TryInto::try_into).transpose()
    }

    #[tracing::instrument(skip(self, amenity), fields(amenity_id = %amenity.id))]
    async fn update_amenity(&self, amenity: &Amenity) -> StoreResult<Amenity> {
        let row: Option<AmenityRow> = sqlx::query_as(&format!(
            "UPDATE amenities SET community_id = $2, name = $3, capacity = $4, \
             description = $5, image_url = $6, category = $7, points_reward = $8 \
             WHERE id = $1 \
             RETURNING {AMENITY_COLUMNS}"
        ))
        .bind(amenity.id.as_uuid())
        .bind(amenity.community_id.map(|c| *c.as_uuid()))
        .bind(&amenity.name)
        .bind(to_i32("capacity", amenity.capacity)?)
        .bind(&amenity.description)
        .bind(&amenity.image_url)
        .bind(amenity.category.as_str())
        .bind(amenity.points_reward)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("update amenity"))?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn list_amenities(&self, community_id: Option<CommunityId>) -> StoreResult<Vec<Amenity>> {
        let rows: Vec<AmenityRow> = sqlx::query_as(&format!(
            "SELECT {AMENITY_COLUMNS} FROM amenities \
             WHERE $1::uuid IS NULL OR community_id = $1 \
             ORDER BY name ASC"
        ))
        .bind(community_id.map(|c| *c.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list amenities"))?;

        convert_all(rows)
    }
}
